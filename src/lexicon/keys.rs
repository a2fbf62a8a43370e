use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic identity of a form field, independent of the target site's
/// attribute names. Closed vocabulary; each key is a mutually exclusive
/// target within one assignment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogicalFieldKey {
    Subject,
    Name,
    LastName,
    FirstName,
    Furigana,
    KanaSei,
    KanaMei,
    Email,
    EmailConfirm,
    Phone,
    Phone1,
    Phone2,
    Phone3,
    Company,
    Department,
    Position,
    Website,
    Address,
    PostalCode,
    Prefecture,
    City,
    Street,
    Message,
    /// Numbered site-specific extension slot (`ext_01` .. `ext_05`).
    Extension(u8),
}

pub const MAX_EXTENSION: u8 = 5;

impl LogicalFieldKey {
    /// Every key, in assignment priority order.
    pub fn all() -> Vec<LogicalFieldKey> {
        use LogicalFieldKey::*;
        let mut keys = vec![
            Subject, Name, LastName, FirstName, Furigana, KanaSei, KanaMei, Email, EmailConfirm,
            Phone, Phone1, Phone2, Phone3, Company, Department, Website, Address, Message,
            Position, PostalCode, Prefecture, City, Street,
        ];
        keys.extend((1..=MAX_EXTENSION).map(Extension));
        keys
    }

    /// Lower rank wins ties between keys competing for one element.
    pub const fn priority(self) -> usize {
        use LogicalFieldKey::*;
        match self {
            Subject => 0,
            Name => 1,
            LastName => 2,
            FirstName => 3,
            Furigana => 4,
            KanaSei => 5,
            KanaMei => 6,
            Email => 7,
            EmailConfirm => 8,
            Phone => 9,
            Phone1 => 10,
            Phone2 => 11,
            Phone3 => 12,
            Company => 13,
            Department => 14,
            Website => 15,
            Address => 16,
            Message => 17,
            Position => 18,
            PostalCode => 19,
            Prefecture => 20,
            City => 21,
            Street => 22,
            Extension(n) => 22 + n as usize,
        }
    }

    pub fn as_str(self) -> String {
        use LogicalFieldKey::*;
        let s = match self {
            Subject => "subject",
            Name => "name",
            LastName => "last_name",
            FirstName => "first_name",
            Furigana => "furigana",
            KanaSei => "kana_sei",
            KanaMei => "kana_mei",
            Email => "email",
            EmailConfirm => "email_confirm",
            Phone => "phone",
            Phone1 => "phone1",
            Phone2 => "phone2",
            Phone3 => "phone3",
            Company => "company",
            Department => "department",
            Position => "position",
            Website => "website",
            Address => "address",
            PostalCode => "postal_code",
            Prefecture => "prefecture",
            City => "city",
            Street => "street",
            Message => "message",
            Extension(n) => return format!("ext_{:02}", n),
        };
        s.to_string()
    }

    /// Keys whose values are personal names.
    pub fn is_name_like(self) -> bool {
        use LogicalFieldKey::*;
        matches!(self, Name | LastName | FirstName)
    }

    pub fn is_kana(self) -> bool {
        use LogicalFieldKey::*;
        matches!(self, Furigana | KanaSei | KanaMei)
    }

    pub fn is_email_like(self) -> bool {
        matches!(self, LogicalFieldKey::Email | LogicalFieldKey::EmailConfirm)
    }

    pub fn is_phone_like(self) -> bool {
        use LogicalFieldKey::*;
        matches!(self, Phone | Phone1 | Phone2 | Phone3)
    }

    /// Keys that accept free text spanning several lines.
    pub fn is_long_text(self) -> bool {
        matches!(self, LogicalFieldKey::Message | LogicalFieldKey::Address)
    }

    /// Keys that may legitimately target a `<select>`.
    pub fn accepts_select(self) -> bool {
        use LogicalFieldKey::*;
        matches!(self, Subject | Prefecture | Position | Department)
    }

    /// The `_confirm` variant of this key, if the vocabulary has one.
    pub fn confirm_variant(self) -> Option<LogicalFieldKey> {
        match self {
            LogicalFieldKey::Email => Some(LogicalFieldKey::EmailConfirm),
            _ => None,
        }
    }

    /// Base key of a `_confirm` variant.
    pub fn confirm_base(self) -> Option<LogicalFieldKey> {
        match self {
            LogicalFieldKey::EmailConfirm => Some(LogicalFieldKey::Email),
            _ => None,
        }
    }

    /// Resolve an applicant-data key (canonical name or common alias).
    pub fn from_data_key(raw: &str) -> Option<LogicalFieldKey> {
        use LogicalFieldKey::*;
        if let Ok(key) = raw.parse() {
            return Some(key);
        }
        let key = match raw.trim().to_lowercase().as_str() {
            "full_name" | "fullname" | "your-name" => Name,
            "namesei" | "name_sei" | "sei" => LastName,
            "namemei" | "name_mei" | "mei" => FirstName,
            "kanasei" => KanaSei,
            "kanamei" => KanaMei,
            "kana" | "yomigana" => Furigana,
            "mail" | "e-mail" | "email_address" => Email,
            "tel" | "telephone" => Phone,
            "company_name" | "organization" => Company,
            "job_title" | "title" => Position,
            "url" | "homepage" => Website,
            "zip" | "zipcode" | "postcode" => PostalCode,
            "pref" => Prefecture,
            "content" | "inquiry" | "comment" | "body" => Message,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for LogicalFieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl FromStr for LogicalFieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use LogicalFieldKey::*;
        let key = match s {
            "subject" => Subject,
            "name" => Name,
            "last_name" => LastName,
            "first_name" => FirstName,
            "furigana" => Furigana,
            "kana_sei" => KanaSei,
            "kana_mei" => KanaMei,
            "email" => Email,
            "email_confirm" => EmailConfirm,
            "phone" => Phone,
            "phone1" => Phone1,
            "phone2" => Phone2,
            "phone3" => Phone3,
            "company" => Company,
            "department" => Department,
            "position" => Position,
            "website" => Website,
            "address" => Address,
            "postal_code" => PostalCode,
            "prefecture" => Prefecture,
            "city" => City,
            "street" => Street,
            "message" => Message,
            other => {
                let n = other
                    .strip_prefix("ext_")
                    .and_then(|d| d.parse::<u8>().ok())
                    .filter(|n| (1..=MAX_EXTENSION).contains(n))
                    .ok_or_else(|| format!("unknown field key '{}'", other))?;
                Extension(n)
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for LogicalFieldKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogicalFieldKey> for String {
    fn from(key: LogicalFieldKey) -> Self {
        key.as_str()
    }
}
