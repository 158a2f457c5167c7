//! Search filter construction

/// Token replaced by the caller name or caller DN
pub const SUBSTITUTION_TOKEN: &str = "%s";

/// Accepted alias of [`SUBSTITUTION_TOKEN`]
const PERMISSIVE_TOKEN: &str = "%v";

/// Build a search filter from a configured template
///
/// If the template contains the substitution token, the token is replaced
/// by `value` and the result used as is. Otherwise the template is ANDed
/// with `(attribute=value)`. Templates that are not parenthesized get
/// wrapped first.
///
/// `value` is inserted verbatim: filter metacharacters are not escaped.
pub fn build_filter(template: &str, value: &str, attribute: &str) -> String {
    let mut filter = template.replace(PERMISSIVE_TOKEN, SUBSTITUTION_TOKEN);

    if !filter.is_empty() && !(filter.starts_with('(') && filter.ends_with(')')) {
        filter = format!("({})", filter);
    }

    if filter.contains(SUBSTITUTION_TOKEN) {
        filter.replace(SUBSTITUTION_TOKEN, value)
    } else {
        format!("(&{}({}={}))", filter, attribute, value)
    }
}
