/// Upper-cases the first letter of every run of cased letters and lower-cases
/// the rest, so `o'brien` becomes `O'Brien` and `SMITH` becomes `Smith`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for ch in s.chars() {
        if prev_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_cased = ch.is_lowercase() || ch.is_uppercase();
    }
    out
}
