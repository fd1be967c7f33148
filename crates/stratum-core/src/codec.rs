//! Fixed-width little-endian wire codec (§4.1).
//!
//! Every field has an explicit width; nothing is ever serialized as a raw
//! memory copy of a Rust struct. A peer record is 24 bytes: `key:u32`,
//! `degree:u32`, `value:f64`, `dist:u32`, `next_hop:u32`. A level record is
//! 20 bytes of header (`level:u32`, `rep:u32`, `rep_dist:u32`,
//! `rep_value:f64`, `num_peers:u32`) followed by its peer records. A
//! message is `sender:u32`, `num_levels:u32`, then the level records.
//!
//! `rep_next_hop` is never sent: it names a local neighbor id that is
//! meaningless to the receiver, so decoded levels carry `rep_next_hop = 0`.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{Level, PeerEntry};

const PEER_SIZE: usize = 4 + 4 + 8 + 4 + 4;
const LEVEL_HEADER_SIZE: usize = 4 + 4 + 4 + 8 + 4;
const MESSAGE_HEADER_SIZE: usize = 4 + 4;

/// A malformed or truncated inbound message.
///
/// The original marshaller tolerates truncated input by silently returning
/// a partial parse; this codec reports the failure instead so the caller
/// can drop the datagram and log it, per §7.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("message truncated: need at least {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("trailing {0} byte(s) after the last declared level")]
    TrailingBytes(usize),
}

/// Exact encoded length of a message reporting `levels`.
pub fn encoded_size(levels: &[Level]) -> usize {
    let mut size = MESSAGE_HEADER_SIZE;
    for level in levels {
        size += LEVEL_HEADER_SIZE + level.peers.len() * PEER_SIZE;
    }
    size
}

/// Serializes `levels` as reported by `sender`.
pub fn encode(sender: u32, levels: &[Level]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_size(levels));
    buf.extend_from_slice(&sender.to_le_bytes());
    buf.extend_from_slice(&(levels.len() as u32).to_le_bytes());
    for level in levels {
        buf.extend_from_slice(&level.level.to_le_bytes());
        buf.extend_from_slice(&level.rep.to_le_bytes());
        buf.extend_from_slice(&level.rep_dist.to_le_bytes());
        buf.extend_from_slice(&level.rep_value.to_le_bytes());
        buf.extend_from_slice(&(level.peers.len() as u32).to_le_bytes());
        for (&key, peer) in &level.peers {
            buf.extend_from_slice(&key.to_le_bytes());
            buf.extend_from_slice(&peer.degree.to_le_bytes());
            buf.extend_from_slice(&peer.value.to_le_bytes());
            buf.extend_from_slice(&peer.dist.to_le_bytes());
            buf.extend_from_slice(&peer.next_hop.to_le_bytes());
        }
    }
    buf
}

/// Parses a message, returning the sender id and its reported levels.
pub fn decode(buf: &[u8]) -> Result<(u32, Vec<Level>), DecodeError> {
    let mut cursor = Cursor::new(buf);
    let sender = cursor.u32()?;
    let num_levels = cursor.u32()?;
    let mut levels = Vec::with_capacity(num_levels as usize);
    for _ in 0..num_levels {
        let level = cursor.u32()?;
        let rep = cursor.u32()?;
        let rep_dist = cursor.u32()?;
        let rep_value = cursor.f64()?;
        let num_peers = cursor.u32()?;
        let mut peers = HashMap::with_capacity(num_peers as usize);
        for _ in 0..num_peers {
            let key = cursor.u32()?;
            let degree = cursor.u32()?;
            let value = cursor.f64()?;
            let dist = cursor.u32()?;
            let next_hop = cursor.u32()?;
            peers.insert(
                key,
                PeerEntry {
                    degree,
                    value,
                    next_hop,
                    dist,
                },
            );
        }
        levels.push(Level {
            level,
            rep,
            rep_next_hop: 0,
            rep_dist,
            rep_value,
            peers,
        });
    }
    if cursor.remaining() > 0 {
        return Err(DecodeError::TrailingBytes(cursor.remaining()));
    }
    Ok((sender, levels))
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(f64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_levels() -> Vec<Level> {
        let mut l0 = Level::new(0);
        l0.rep = 1;
        l0.peers.insert(2, PeerEntry::new(3, 2, 1));
        let mut l1 = Level::new(1);
        l1.rep = 1;
        l1.rep_dist = 0;
        l1.rep_value = 4.5;
        vec![l0, l1]
    }

    #[test]
    fn round_trips() {
        let levels = sample_levels();
        let wire = encode(1, &levels);
        assert_eq!(wire.len(), encoded_size(&levels));
        let (sender, decoded) = decode(&wire).unwrap();
        assert_eq!(sender, 1);
        assert_eq!(decoded.len(), levels.len());
        assert_eq!(decoded[0].peers.get(&2), levels[0].peers.get(&2));
        assert_eq!(decoded[1].rep_value, 4.5);
        assert_eq!(decoded[0].rep_next_hop, 0);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let levels = sample_levels();
        let wire = encode(1, &levels);
        let err = decode(&wire[..wire.len() - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let levels = sample_levels();
        let mut wire = encode(1, &levels);
        wire.push(0);
        let err = decode(&wire).unwrap_err();
        assert_eq!(err, DecodeError::TrailingBytes(1));
    }

    #[test]
    fn empty_levels_round_trip() {
        let wire = encode(7, &[]);
        let (sender, decoded) = decode(&wire).unwrap();
        assert_eq!(sender, 7);
        assert!(decoded.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_levels_round_trip(
            sender: u32,
            specs in proptest::collection::vec(
                (any::<u32>(), any::<u32>(), any::<f64>(), proptest::collection::vec((any::<u32>(), any::<u32>(), any::<f64>()), 0..4)),
                0..4,
            ),
        ) {
            let levels: Vec<Level> = specs
                .into_iter()
                .enumerate()
                .map(|(i, (rep, rep_dist, rep_value, peer_specs))| {
                    let mut level = Level::new(i as u32);
                    level.rep = rep;
                    level.rep_dist = rep_dist;
                    level.rep_value = rep_value;
                    for (j, (degree, dist, value)) in peer_specs.into_iter().enumerate() {
                        let mut entry = PeerEntry::new(degree, j as u32, dist);
                        entry.value = value;
                        level.peers.insert(j as u32, entry);
                    }
                    level
                })
                .collect();

            let wire = encode(sender, &levels);
            prop_assert_eq!(wire.len(), encoded_size(&levels));
            let (decoded_sender, decoded) = decode(&wire).unwrap();
            prop_assert_eq!(decoded_sender, sender);
            prop_assert_eq!(decoded.len(), levels.len());
            for (original, decoded) in levels.iter().zip(decoded.iter()) {
                prop_assert_eq!(original.rep, decoded.rep);
                prop_assert_eq!(original.rep_dist, decoded.rep_dist);
                prop_assert_eq!(original.rep_value.to_bits(), decoded.rep_value.to_bits());
                prop_assert_eq!(decoded.rep_next_hop, 0);
                prop_assert_eq!(original.peers.len(), decoded.peers.len());
                for (key, peer) in &original.peers {
                    let other = decoded.peers.get(key).unwrap();
                    prop_assert_eq!(peer.degree, other.degree);
                    prop_assert_eq!(peer.dist, other.dist);
                    prop_assert_eq!(peer.next_hop, other.next_hop);
                    prop_assert_eq!(peer.value.to_bits(), other.value.to_bits());
                }
            }
        }
    }
}
