use smol_str::SmolStr;

#[inline(always)]
pub fn lower_case(s: &str) -> SmolStr {
    s.chars()
        .map(|c| c.to_lowercase().collect::<String>())
        .collect::<SmolStr>()
}

#[inline(always)]
pub fn upper_case(s: &str) -> SmolStr {
    s.chars()
        .map(|c| c.to_uppercase().collect::<String>())
        .collect::<SmolStr>()
}

#[inline(always)]
pub fn upper_first(s: &str) -> SmolStr {
    let mut c = s.chars();
    match c.next() {
        None => SmolStr::new(""),
        Some(f) => SmolStr::from(f.to_uppercase().collect::<String>() + c.as_str()),
    }
}

/// Single-character case folding used by the tokenizer. Characters whose
/// lower-case form expands to several code points are left untouched.
#[inline(always)]
pub fn fold_case(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(c), None) => c,
        _ => ch,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    Neither,
}

impl Case {
    #[inline(always)]
    fn new(ch: char) -> Case {
        if ch.is_lowercase() {
            Case::Lower
        } else if ch.is_uppercase() {
            Case::Upper
        } else {
            Case::Neither
        }
    }
}

pub fn is_mixed_case(word: &str) -> bool {
    let mut chars = word.chars();
    let mut last_case = match chars.next() {
        Some(ch) => Case::new(ch),
        None => return false,
    };

    if last_case == Case::Neither {
        return false;
    }

    let mut case_changes = 0;

    for ch in chars {
        let next_case = Case::new(ch);

        match (last_case, next_case) {
            (_, Case::Neither) => return false,
            (Case::Lower, Case::Upper) => case_changes += 2,
            (Case::Upper, Case::Lower) => case_changes += 1,
            _ => {}
        }

        last_case = next_case;
    }

    case_changes > 1
}

pub fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && upper_case(word) == word
}

pub fn is_first_caps(word: &str) -> bool {
    word.chars().next().map_or(false, char::is_uppercase) && upper_first(word) == word
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMutation {
    FirstCaps,
    AllCaps,
    Mixed,
    None,
}

pub fn case_mutation(word: &str) -> CaseMutation {
    if is_all_caps(word) && word.chars().filter(|c| c.is_alphabetic()).count() > 1 {
        CaseMutation::AllCaps
    } else if is_mixed_case(word) {
        CaseMutation::Mixed
    } else if is_first_caps(word) {
        CaseMutation::FirstCaps
    } else {
        CaseMutation::None
    }
}

/// Carries the capitalisation of `original` over to `replacement`.
///
/// Whole-word patterns (all caps, leading capital) are reapplied as such.
/// Mixed-case words are copied character by character; replacement
/// characters past the end of the original follow its last character.
pub fn restore_case(original: &str, replacement: &str) -> SmolStr {
    match case_mutation(original) {
        CaseMutation::AllCaps => upper_case(replacement),
        CaseMutation::FirstCaps => upper_first(replacement),
        CaseMutation::None => replacement.into(),
        CaseMutation::Mixed => {
            let cases = original.chars().map(Case::new).collect::<Vec<_>>();
            let last = cases.len() - 1;

            let mut out = String::with_capacity(replacement.len());
            for (i, ch) in replacement.chars().enumerate() {
                match cases[i.min(last)] {
                    Case::Upper => out.extend(ch.to_uppercase()),
                    _ => out.push(ch),
                }
            }
            out.into()
        }
    }
}
