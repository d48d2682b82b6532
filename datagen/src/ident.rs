// Copyright 2021 UMD Database Group. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-format identifiers: `PRE-DDDDD-LLL`.
//!
//! Five random digits and three random uppercase letters give about 33 bits of
//! entropy per prefix. Nothing here guards against collisions; the batch
//! assembler re-draws identifiers that collide inside a batch.

use rand::Rng;

const DIGITS: usize = 5;
const LETTERS: usize = 3;

/// The length of every identifier, `PRE-DDDDD-LLL`.
pub const IDENTIFIER_LENGTH: usize = 3 + 1 + DIGITS + 1 + LETTERS;

/// Identifier generation on top of a random source.
pub trait IdentifierRng {
    /// Returns a new identifier with the given three-letter prefix.
    fn gen_identifier(&mut self, prefix: &str) -> String;
}

impl<R: Rng + ?Sized> IdentifierRng for R {
    fn gen_identifier(&mut self, prefix: &str) -> String {
        let mut id = String::with_capacity(IDENTIFIER_LENGTH);
        id.push_str(prefix);
        id.push('-');
        (0..DIGITS).for_each(|_| id.push(char::from(b'0' + self.gen_range(0..10u8))));
        id.push('-');
        (0..LETTERS).for_each(|_| id.push(char::from(b'A' + self.gen_range(0..26u8))));
        id
    }
}

/// Returns true if `candidate` is a well-formed identifier with `prefix`.
pub fn is_identifier(candidate: &str, prefix: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == IDENTIFIER_LENGTH
        && candidate.starts_with(prefix)
        && bytes[3] == b'-'
        && bytes[4..4 + DIGITS].iter().all(u8::is_ascii_digit)
        && bytes[4 + DIGITS] == b'-'
        && bytes[5 + DIGITS..].iter().all(u8::is_ascii_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PATIENT_PREFIX, SAMPLE_PREFIX};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_identifier_format() {
        let mut rng = SmallRng::seed_from_u64(1u64);
        for _ in 0..1000 {
            let patient = rng.gen_identifier(PATIENT_PREFIX);
            let sample = rng.gen_identifier(SAMPLE_PREFIX);
            assert!(is_identifier(&patient, PATIENT_PREFIX), "{}", patient);
            assert!(is_identifier(&sample, SAMPLE_PREFIX), "{}", sample);
            assert_eq!(patient.len(), 13);
        }
    }

    #[test]
    fn test_identifier_is_seeded() {
        let ids_1 = {
            let mut rng = SmallRng::seed_from_u64(7u64);
            (0..10).map(|_| rng.gen_identifier("PAC")).collect::<Vec<_>>()
        };
        let ids_2 = {
            let mut rng = SmallRng::seed_from_u64(7u64);
            (0..10).map(|_| rng.gen_identifier("PAC")).collect::<Vec<_>>()
        };
        assert_eq!(ids_1, ids_2);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(is_identifier("PAC-01234-ABC", "PAC"));
        assert!(!is_identifier("PAC-01234-ABC", "SMP"));
        assert!(!is_identifier("PAC-0123A-ABC", "PAC"));
        assert!(!is_identifier("PAC-01234-abc", "PAC"));
        assert!(!is_identifier("PAC_01234-ABC", "PAC"));
        assert!(!is_identifier("PAC-01234-ABCD", "PAC"));
    }
}
