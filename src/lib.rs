/*!
A keygen library for the `KeygenMe again (LINUX)` crackme. It reproduces the
target binary's reverse-engineered registration check, so that given a
username a matching serial key can be generated (and a candidate key can be
verified) entirely offline.

The check is a checksum, not a cipher; nothing in here is cryptographically
meaningful. The only goal is to match the target bit for bit.

# Anatomy of a serial key

The target folds the username into a 4-byte accumulator with XOR, cycling
over the accumulator slots, then XORs the accumulator against a magic
constant found in the disassembly (`0xAC4C6B37`, stored little-endian in
memory as `[0x37, 0x6B, 0x4C, 0xAC]`):

```text
┌────┬────┬────┬────┐
│ A0 │ A1 │ A2 │ A3 │  accumulator: username byte i lands in slot i mod 4
├────┼────┼────┼────┤
│0x37│0x6B│0x4C│0xAC│  seed: the magic constant's little-endian byte image
└────┴────┴────┴────┘
       column-wise XOR, printed as eight uppercase hex digits
```

An empty username never reaches that loop: the target hardcodes the reply
`"AC4C6B37"` for it, which is the seed read back as a 32-bit little-endian
integer rather than the seed bytes in slot order. This library replicates
the quirk as-is.

# Generating a serial key

```rust
use serial_keygen::*;

// The default generator refuses usernames the target never understood
// (characters above U+00FF).
let key = generate_serial("hacktooth").unwrap();

assert_eq!("436540B3", key.as_str());
```

# Verifying a serial key

```rust
use serial_keygen::*;

let mut verifier = Verifier::new(WideCharPolicy::Reject);

// Refuse a username that should no longer validate, for example
// because its key was posted publicly.
verifier.block("leaked-user");

match verifier.verify("hacktooth", "436540B3") {
    Status::Valid => println!("Key is valid!"),
    Status::Invalid => println!("Key is invalid!"),
    Status::Blocked => println!("Username has been blocked!"),
    Status::Malformed => println!("That is not even a serial key!"),
}
```

# Characters outside the single-byte range

The target only ever consumed single-byte input, so the check is undefined
for wider code points. [`WideCharPolicy`] makes the choice explicit:
[`Reject`](WideCharPolicy::Reject) (the default) refuses such usernames
with a descriptive error, while [`Truncate`](WideCharPolicy::Truncate)
folds each offending code point to its low 8 bits. Either way the mapping
is deterministic; use the same policy for generation and verification.
*/

use std::fmt;

use thiserror::Error;

/// The 4-byte constant XORed into the accumulator to produce the final
/// serial. Little-endian byte image of the magic `0xAC4C6B37`.
pub const SEED: [u8; 4] = [0x37, 0x6B, 0x4C, 0xAC];

/// The serial the target accepts for an empty username.
///
/// This is a hardcoded reply in the target, not the output of its
/// formatting loop: the seed is read back as a little-endian `u32` instead
/// of byte by byte in slot order. Kept literal here for the same reason.
pub const EMPTY_USERNAME_SERIAL: &str = "AC4C6B37";

const SERIAL_HEX_LENGTH: usize = 8;

/// Errors produced while deriving a serial key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeygenError {
    /// A character's code point does not fit in a single byte and the
    /// generator was built with [`WideCharPolicy::Reject`].
    #[error("character {ch:?} at position {index} does not fit in a single byte")]
    CharacterOutOfRange { ch: char, index: usize },
}

/// Deterministic mapping for characters whose code point exceeds `0xFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideCharPolicy {
    /// Refuse the username with [`KeygenError::CharacterOutOfRange`].
    Reject,
    /// Fold the code point to its low 8 bits.
    Truncate,
}

impl Default for WideCharPolicy {
    fn default() -> Self {
        WideCharPolicy::Reject
    }
}

/// Represents a generated serial key: eight uppercase hexadecimal digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialKey {
    text: String,
}

impl SerialKey {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    /// Gets the serial as an 8-character uppercase hex string slice.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the key, returning the owned string.
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for SerialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Derives the serial key for `username` using the default
/// [`WideCharPolicy::Reject`] policy.
pub fn generate_serial(username: &str) -> Result<SerialKey, KeygenError> {
    Generator::default().generate(username)
}

/// The serial key generator.
#[derive(Debug, Default)]
pub struct Generator {
    policy: WideCharPolicy,
}

impl Generator {
    /// Creates a new serial key generator with an explicit wide-character
    /// policy.
    pub fn new(policy: WideCharPolicy) -> Self {
        Self { policy }
    }

    /// Derives the serial key for the specified username.
    ///
    /// An empty username short-circuits to [`EMPTY_USERNAME_SERIAL`]; see
    /// the crate docs for why that branch must stay separate from the
    /// general path.
    pub fn generate(&self, username: &str) -> Result<SerialKey, KeygenError> {
        if username.is_empty() {
            return Ok(SerialKey::new(EMPTY_USERNAME_SERIAL.to_owned()));
        }

        // Fold the username into the accumulator, cycling over the slots
        let mut accumulator = [0u8; 4];
        for (index, ch) in username.chars().enumerate() {
            accumulator[index % 4] ^= self.byte_value(ch, index)?;
        }

        // Final stage: XOR with the seed
        let mut serial = [0u8; 4];
        for k in 0..serial.len() {
            serial[k] = accumulator[k] ^ SEED[k];
        }

        Ok(SerialKey::new(hex::encode_upper(serial)))
    }

    fn byte_value(&self, ch: char, index: usize) -> Result<u8, KeygenError> {
        let code_point = ch as u32;
        if code_point <= 0xFF {
            return Ok(code_point as u8);
        }
        match self.policy {
            WideCharPolicy::Truncate => Ok((code_point & 0xFF) as u8),
            WideCharPolicy::Reject => Err(KeygenError::CharacterOutOfRange { ch, index }),
        }
    }
}

/// Representation of a verification outcome.
#[derive(Debug, PartialEq, Eq)]
pub enum Status {
    /// The serial matches the username.
    Valid,
    /// The serial is well-formed but does not match the username.
    Invalid,
    /// The username has been blocked.
    Blocked,
    /// The candidate is not eight hexadecimal digits.
    Malformed,
}

/// The serial key verifier.
#[derive(Debug, Default)]
pub struct Verifier {
    generator: Generator,
    blocklist: Vec<String>,
}

impl Verifier {
    /// Creates a new serial key verifier using the same wide-character
    /// policy as the generator that issued the keys.
    pub fn new(policy: WideCharPolicy) -> Self {
        Self {
            generator: Generator::new(policy),
            blocklist: Vec::new(),
        }
    }

    /// Blocks the specified username from validating.
    ///
    /// You might want to do this if a key was leaked or the owner
    /// requested a refund.
    pub fn block(&mut self, username: &str) {
        self.blocklist.push(username.to_owned())
    }

    /// Performs verification on the provided username and candidate serial.
    ///
    /// The candidate is trimmed and compared case-insensitively; anything
    /// that is not exactly eight hex digits is [`Status::Malformed`].
    pub fn verify(&self, username: &str, serial: &str) -> Status {
        let candidate = serial.trim().to_uppercase();
        if candidate.len() != SERIAL_HEX_LENGTH || hex::decode(&candidate).is_err() {
            return Status::Malformed;
        }

        // Blocked username?
        for blocked in self.blocklist.iter() {
            if blocked == username {
                return Status::Blocked;
            }
        }

        match self.generator.generate(username) {
            Ok(expected) => {
                if expected.as_str() == candidate {
                    Status::Valid
                } else {
                    Status::Invalid
                }
            }
            // A username the algorithm cannot digest has no valid serial.
            Err(_) => Status::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    pub fn create_verifier() -> Verifier {
        Verifier::new(WideCharPolicy::Reject)
    }

    #[test]
    pub fn empty_username_should_return_the_hardcoded_reply() {
        // Given, When
        let key = generate_serial("").unwrap();

        // Then
        assert_eq!("AC4C6B37", key.as_str());
    }

    #[test]
    pub fn single_character_should_land_in_the_first_slot() {
        // Given: 'A' = 0x41, and 0x41 ^ 0x37 = 0x76
        let key = generate_serial("A").unwrap();

        assert_eq!("766B4CAC", key.as_str());
    }

    #[test]
    pub fn four_characters_should_fill_every_slot() {
        let key = generate_serial("ABCD").unwrap();

        assert_eq!("76290FE8", key.as_str());
    }

    #[test]
    pub fn fifth_character_should_wrap_back_to_the_first_slot() {
        // Given: slot 0 receives 0x41 ^ 0x45 = 0x04, then 0x04 ^ 0x37 = 0x33
        let key = generate_serial("ABCDE").unwrap();

        assert_eq!("33290FE8", key.as_str());
    }

    #[test]
    pub fn generation_should_be_deterministic() {
        // Given, When
        let first = generate_serial("hacktooth").unwrap();
        let second = generate_serial("hacktooth").unwrap();

        // Then
        assert_eq!(first, second);
    }

    #[test]
    pub fn swapping_characters_four_apart_should_not_change_the_serial() {
        // Given: positions 0 and 4 both fold into slot 0, and XOR commutes
        let first = generate_serial("ABCDE").unwrap();
        let second = generate_serial("EBCDA").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    pub fn swapping_adjacent_characters_should_change_the_serial() {
        // Given: positions 0 and 1 fold into different slots
        let first = generate_serial("AB").unwrap();
        let second = generate_serial("BA").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    pub fn wide_character_should_be_rejected_by_default() {
        // Given: '€' is U+20AC, well outside a single byte
        let result = generate_serial("€uro");

        assert_eq!(
            Err(KeygenError::CharacterOutOfRange { ch: '€', index: 0 }),
            result
        );
    }

    #[test]
    pub fn truncate_policy_should_fold_wide_characters_to_their_low_byte() {
        // Given: U+20AC folds to 0xAC, and 0xAC ^ 0x37 = 0x9B
        let generator = Generator::new(WideCharPolicy::Truncate);

        // When
        let key = generator.generate("€").unwrap();

        // Then
        assert_eq!("9B6B4CAC", key.as_str());
    }

    #[test]
    pub fn valid_key_should_be_valid() {
        // Given
        let key = generate_serial("hacktooth").unwrap();
        let verifier = create_verifier();

        // When
        let result = verifier.verify("hacktooth", key.as_str());

        // Then
        assert_eq!(Status::Valid, result);
    }

    #[test]
    pub fn lowercase_candidate_should_still_be_valid() {
        // Given
        let key = generate_serial("hacktooth").unwrap();
        let verifier = create_verifier();

        // When
        let result = verifier.verify("hacktooth", &key.as_str().to_lowercase());

        // Then
        assert_eq!(Status::Valid, result);
    }

    #[test]
    pub fn mismatched_key_should_be_invalid() {
        // Given
        let verifier = create_verifier();

        // When
        let result = verifier.verify("hacktooth", "00000000");

        // Then
        assert_eq!(Status::Invalid, result);
    }

    #[test]
    pub fn valid_but_blocked_username_should_return_blocked() {
        // Given
        let key = generate_serial("hacktooth").unwrap();
        let mut verifier = create_verifier();
        verifier.block("hacktooth");

        // When
        let result = verifier.verify("hacktooth", key.as_str());

        // Then
        assert_eq!(Status::Blocked, result);
    }

    #[test]
    pub fn non_hex_candidate_should_return_malformed() {
        let verifier = create_verifier();

        assert_eq!(Status::Malformed, verifier.verify("hacktooth", "XYZ"));
        assert_eq!(Status::Malformed, verifier.verify("hacktooth", "436540B3AA"));
        assert_eq!(Status::Malformed, verifier.verify("hacktooth", "4365 40B3"));
    }

    #[test]
    pub fn wide_username_should_never_verify_under_reject() {
        // Given: "9B6B4CAC" is what the Truncate policy would produce
        let verifier = create_verifier();

        // When
        let result = verifier.verify("€", "9B6B4CAC");

        // Then
        assert_eq!(Status::Invalid, result);
    }

    proptest! {
        #[test]
        fn serial_is_always_eight_uppercase_hex_digits(username in "[ -~]{0,64}") {
            let key = generate_serial(&username).unwrap();

            prop_assert_eq!(8, key.as_str().len());
            prop_assert!(key
                .as_str()
                .chars()
                .all(|c| matches!(c, '0'..='9' | 'A'..='F')));
        }

        #[test]
        fn generated_keys_always_verify(username in "[ -~]{1,64}") {
            let key = generate_serial(&username).unwrap();
            let verifier = create_verifier();

            prop_assert_eq!(Status::Valid, verifier.verify(&username, key.as_str()));
        }
    }
}
