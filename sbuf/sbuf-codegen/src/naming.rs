//! Case conversion for generated identifiers. Dots in API names count as
//! word separators everywhere.

pub fn snake_case(s: &str) -> String {
    let s = s.replace('.', "_");
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            if !prev.is_uppercase() && prev != '_' {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out
}

pub fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for part in s.split(['_', '.']) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    out
}

pub fn camel_case(s: &str) -> String {
    let pascal = pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_splits_camel_humps_once() {
        assert_eq!(snake_case("SimInfo"), "sim_info");
        assert_eq!(snake_case("user.getAbc"), "user_get_abc");
        assert_eq!(snake_case("HTTPState"), "httpstate");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn pascal_joins_separated_words() {
        assert_eq!(pascal_case("user.get_abc"), "UserGetAbc");
        assert_eq!(pascal_case("sim_info"), "SimInfo");
        assert_eq!(pascal_case("id"), "Id");
    }

    #[test]
    fn camel_lowers_the_first_letter() {
        assert_eq!(camel_case("user.get_abc"), "userGetAbc");
        assert_eq!(camel_case("Id"), "id");
        assert_eq!(camel_case(""), "");
    }
}
