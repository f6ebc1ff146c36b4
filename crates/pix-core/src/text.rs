//! Нормализация свободного текста (имя, город, описание)
//!
//! EMV считает длину в байтах, поэтому текст приводится к ASCII:
//! диакритика латиницы снимается, остальные не-ASCII символы отбрасываются.

/// Снятие диакритики и удаление не-ASCII символов
pub fn fold_ascii(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii() {
            if !c.is_ascii_control() {
                out.push(c);
            }
            continue;
        }
        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => log::trace!("Dropping non-ASCII character {:?}", c),
        }
    }
    out
}

/// Обрезка до `max` символов (после `fold_ascii` символ = байт)
pub fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Нормализация поля: ASCII, обрезка пробелов, ограничение длины
pub fn normalize(value: &str, max: usize) -> String {
    let folded = fold_ascii(value);
    truncate(folded.trim(), max).trim_end().to_string()
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => "O",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'ç' => "c",
        'Ç' => "C",
        'ñ' => "n",
        'Ñ' => "N",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'ª' => "a",
        'º' => "o",
        '\u{a0}' => " ",
        _ => return None,
    };
    Some(folded)
}
