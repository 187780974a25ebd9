use crate::random::RandomSource;

/// Length of every generated object identifier.
pub const OBJECT_ID_LENGTH: usize = 8;
/// First letter of the identifier alphabet.
pub const ALPHABET_FIRST: u8 = b'a';
/// Last letter of the identifier alphabet, inclusive.
pub const ALPHABET_LAST: u8 = b'z';

/// Draw an 8-character identifier from `a..=z`.
///
/// Collisions are possible and not detected.
pub fn generate_object_id(rng: &mut RandomSource) -> String {
    (0..OBJECT_ID_LENGTH)
        .map(|_| rng.byte(ALPHABET_FIRST, ALPHABET_LAST) as char)
        .collect()
}
