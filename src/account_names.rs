use crate::types::*;

/// Prefix that disambiguates accounts from different source budgets: the
/// budget name itself if it is a single word, otherwise the initials of its
/// words.  Always followed by a space.
pub fn budget_prefix(budget_name: &str) -> String {
    let words: Vec<&str> = budget_name.split_whitespace().collect();
    match words.as_slice() {
        [word] => format!("{} ", word),
        _ => format!(
            "{} ",
            words
                .iter()
                .filter_map(|word| word.chars().next())
                .collect::<String>()
        ),
    }
}

pub fn source_account_name(prefix: &str, account_name: &str) -> NormalizedAccountName {
    // Case-sensitive check against the raw name, so "BA Checking" in budget
    // "Bank A" is not prefixed twice.
    if account_name.contains(prefix) {
        NormalizedAccountName::new(account_name)
    } else {
        NormalizedAccountName::new(&format!("{}{}", prefix, account_name))
    }
}

pub fn destination_account_name(account_name: &str) -> NormalizedAccountName {
    NormalizedAccountName::new(account_name)
}
