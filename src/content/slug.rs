//! Slug generation for post routes and heading anchors
//!
//! Anchors are part of every published URL (`/posts/<slug>#<fragment>`), so
//! the output for a given input must never change between releases.

/// Characters transliterated one-to-one, paired index by index with `TO`.
const FROM: &str = "àáâäæãåāăąçćčđďèéêëēėęěğǵḧîïíīįìłḿñńǹňôöòóœøōõőṕŕřßśšşșťțûüùúūǘůűųẃẍÿýžźż·/_,:;";
const TO: &str = "aaaaaaaaaacccddeeeeeeeegghiiiiiilmnnnnoooooooooprrsssssttuuuuuuuuuwxyyzzz------";

fn transliterate(c: char) -> Option<char> {
    FROM.chars()
        .position(|from| from == c)
        .and_then(|i| TO.chars().nth(i))
}

/// Turn arbitrary text into a lowercase, hyphen-separated ascii token.
///
/// Never fails; input made only of stripped characters yields an empty string.
///
/// ```
/// assert_eq!(postforge::content::slugify("Hello, World!"), "hello-world");
/// assert_eq!(postforge::content::slugify("Crème Brûlée & Co"), "creme-brulee-and-co");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut mapped = String::with_capacity(lowered.len());
    let mut in_space = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_space {
                mapped.push('-');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        match c {
            '&' => mapped.push_str("-and-"),
            _ => mapped.push(transliterate(c).unwrap_or(c)),
        }
    }

    let mut slug = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            '-' if !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }

    slug.trim_matches('-').to_string()
}
