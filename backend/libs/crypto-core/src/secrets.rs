//! HMAC secret strength checks
//!
//! Used at startup to refuse weak `JWT_*_SECRET` values in production.

const MIN_SECRET_LENGTH: usize = 32;
const RECOMMENDED_SECRET_LENGTH: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum SecretStrength {
    Weak,
    Acceptable,
    Strong,
}

/// Classify an HS256 secret.
///
/// Weak when shorter than 32 bytes, Shannon entropy below 4 bits/byte, or
/// containing runs like `aaaa` / `1234`.
pub fn secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < 4.0 || has_obvious_patterns(bytes) {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut same_run = 1;
    let mut seq_run = 1;

    for window in data.windows(2) {
        same_run = if window[0] == window[1] { same_run + 1 } else { 1 };
        seq_run = if window[1] as i16 - window[0] as i16 == 1 {
            seq_run + 1
        } else {
            1
        };

        if same_run >= 4 || seq_run >= 4 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_is_weak() {
        assert_eq!(secret_strength("short"), SecretStrength::Weak);
    }

    #[test]
    fn test_repeating_secret_is_weak() {
        assert_eq!(secret_strength(&"a".repeat(64)), SecretStrength::Weak);
    }

    #[test]
    fn test_sequential_run_is_weak() {
        assert_eq!(
            secret_strength("abcdQ9#zP2@kW7!mX4$rT8%vN3^yL6&j"),
            SecretStrength::Weak
        );
    }

    #[test]
    fn test_random_secret_is_acceptable() {
        assert_eq!(
            secret_strength("Zq8#Lm2!Vx7@Tp4$Rk9%Wn3^Hs6&Jd1*"),
            SecretStrength::Acceptable
        );
    }
}
