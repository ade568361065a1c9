//! User Name Value Object
//!
//! ユーザー名はログインに使う**識別子**。
//!
//! ## 設計方針
//! - ASCII文字のみ許可（a-z, 0-9, _ . -）
//! - 大文字入力は受け付けるが、canonical（正規形）は小文字
//! - NFKC正規化 → trim → 小文字化 → 検証 の順で処理
//!
//! ## 不変条件
//! - 長さ: 3〜30文字（正規化後）
//! - 先頭・末尾: 英数字または `_`
//! - 連続ドット禁止（`..`）
//! - 英数字を最低1文字含む

use std::fmt;

use unicode_normalization::UnicodeNormalization;

pub const USER_NAME_MIN_LENGTH: usize = 3;
pub const USER_NAME_MAX_LENGTH: usize = 30;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-'];

/// ユーザー名の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserNameError {
    #[error("User name cannot be empty")]
    Empty,

    #[error("User name must be {min}-{max} characters (got {length})")]
    Length { length: usize, min: usize, max: usize },

    #[error("Invalid character '{char}' at position {position}")]
    InvalidCharacter { char: char, position: usize },

    #[error("User name must start and end with a-z, 0-9 or _")]
    InvalidBoundary,

    #[error("User name cannot contain consecutive dots (..)")]
    ConsecutiveDots,

    #[error("User name must contain at least one letter or digit")]
    NoAlphanumeric,
}

/// 検証済み・正規化済みユーザー名
///
/// `original` は入力の表記（NFKC + trim、大文字小文字は保持）、
/// `canonical` は検索・一意性判定に使う小文字形。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserName {
    original: String,
    canonical: String,
}

impl UserName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UserNameError> {
        let original: String = input.as_ref().nfkc().collect::<String>().trim().to_string();
        let canonical = original.to_lowercase();
        validate(&canonical)?;
        Ok(Self {
            original,
            canonical,
        })
    }

    /// DB から読み出した値を復元（保存時に検証済み）
    pub fn from_db(original: &str) -> Self {
        Self {
            original: original.to_string(),
            canonical: original.to_lowercase(),
        }
    }

    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

fn validate(canonical: &str) -> Result<(), UserNameError> {
    if canonical.is_empty() {
        return Err(UserNameError::Empty);
    }

    let length = canonical.chars().count();
    if !(USER_NAME_MIN_LENGTH..=USER_NAME_MAX_LENGTH).contains(&length) {
        return Err(UserNameError::Length {
            length,
            min: USER_NAME_MIN_LENGTH,
            max: USER_NAME_MAX_LENGTH,
        });
    }

    if let Some((position, char)) = canonical
        .chars()
        .enumerate()
        .find(|(_, c)| !is_valid_char(*c))
    {
        return Err(UserNameError::InvalidCharacter { char, position });
    }

    let boundary_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if !boundary_ok(canonical.chars().next()) || !boundary_ok(canonical.chars().next_back()) {
        return Err(UserNameError::InvalidBoundary);
    }

    if canonical.contains("..") {
        return Err(UserNameError::ConsecutiveDots);
    }

    if !canonical.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(UserNameError::NoAlphanumeric);
    }

    Ok(())
}

#[inline]
fn is_valid_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ALLOWED_SPECIAL_CHARS.contains(&c)
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserName").field(&self.canonical).finish()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl TryFrom<&str> for UserName {
    type Error = UserNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let name = UserName::new("  Priya_Sharma  ").unwrap();
        assert_eq!(name.canonical(), "priya_sharma");
        assert_eq!(name.original(), "Priya_Sharma");
        assert_eq!(name.to_string(), "Priya_Sharma");
    }

    #[test]
    fn test_fullwidth_input_is_folded() {
        // NFKC: ｒａｈｕｌ → rahul
        let name = UserName::new("ｒａｈｕｌ").unwrap();
        assert_eq!(name.as_str(), "rahul");
    }

    #[test]
    fn test_length_bounds() {
        assert!(matches!(UserName::new("ab"), Err(UserNameError::Length { .. })));
        assert!(UserName::new("abc").is_ok());
        assert!(UserName::new("a".repeat(30)).is_ok());
        assert!(matches!(
            UserName::new("a".repeat(31)),
            Err(UserNameError::Length { .. })
        ));
        assert_eq!(UserName::new("   "), Err(UserNameError::Empty));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            UserName::new("rahul sharma"),
            Err(UserNameError::InvalidCharacter { char: ' ', position: 5 })
        ));
        assert!(matches!(
            UserName::new("राहुल"),
            Err(UserNameError::InvalidCharacter { position: 0, .. })
        ));
        assert!(matches!(
            UserName::new("rahul'--"),
            Err(UserNameError::InvalidCharacter { char: '\'', .. })
        ));
    }

    #[test]
    fn test_structure_rules() {
        assert_eq!(UserName::new(".rahul"), Err(UserNameError::InvalidBoundary));
        assert_eq!(UserName::new("rahul-"), Err(UserNameError::InvalidBoundary));
        assert_eq!(UserName::new("ra..hul"), Err(UserNameError::ConsecutiveDots));
        assert_eq!(UserName::new("___"), Err(UserNameError::NoAlphanumeric));
        assert!(UserName::new("_rahul.k-2_").is_ok());
    }
}
