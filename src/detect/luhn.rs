//! Luhn validation for credit-card candidates

/// Validate a credit-card candidate.
///
/// Non-digits are stripped first; the remaining digit string must be 13-19
/// digits long and satisfy the Luhn mod-10 checksum.
pub fn validate(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                // Double every second digit from the right
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}
