//! Display labels for well-known record fields

use serde_json::Value;

/// Record fields that get a friendly label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// E-mail address
    Email,
    /// Plain-text password
    Password,
    /// Password hash
    PasswordHash,
    /// IP address
    Ip,
    /// Login or nickname
    Username,
    /// Phone number
    Phone,
    /// Full personal name
    FullName,
    /// Postal address
    Address,
    /// Date of birth
    BirthDate,
    /// Website or profile URL
    Url,
}

impl FieldKind {
    /// Classifies an API field name, ignoring case and separators.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
            .flat_map(char::to_lowercase)
            .collect();

        let kind = match normalized.as_str() {
            "email" | "mail" | "emailaddress" => Self::Email,
            "password" | "pass" | "passwd" => Self::Password,
            "passwordhash" | "passhash" => Self::PasswordHash,
            "ip" | "ipaddress" | "lastip" | "regip" => Self::Ip,
            "username" | "login" | "nickname" | "nick" => Self::Username,
            "phone" | "phonenumber" | "telephone" | "mobile" | "tel" => Self::Phone,
            "fullname" => Self::FullName,
            "address" | "homeaddress" => Self::Address,
            "birthday" | "birthdate" | "dob" | "dateofbirth" => Self::BirthDate,
            "url" | "website" => Self::Url,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Password => "Password",
            Self::PasswordHash => "Password hash",
            Self::Ip => "IP",
            Self::Username => "Username",
            Self::Phone => "Phone",
            Self::FullName => "Full name",
            Self::Address => "Address",
            Self::BirthDate => "Birth date",
            Self::Url => "URL",
        }
    }

    /// Icon shown before the label in chat pages
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Email => "📧",
            Self::Password => "🔑",
            Self::PasswordHash => "🔐",
            Self::Ip => "🌐",
            Self::Username => "👤",
            Self::Phone => "📞",
            Self::FullName => "🪪",
            Self::Address => "🏠",
            Self::BirthDate => "🎂",
            Self::Url => "🔗",
        }
    }
}

/// One rendered record field, kept in both page and export form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    /// Line shown in chat pages (icon and friendly label for known fields)
    pub page: String,
    /// `key: value` line written to the export, with the API's own field name
    pub export: String,
}

/// Renders a single record field. Key and value are HTML-escaped.
#[must_use]
pub fn render_field(key: &str, value: &Value) -> FieldLine {
    let value = crate::utils::escape_html(&value_text(value));
    let export = format!("{}: {value}", crate::utils::escape_html(key));
    let page = match FieldKind::from_key(key) {
        Some(kind) => format!("{} {}: {value}", kind.icon(), kind.label()),
        None => export.clone(),
    };
    FieldLine { page, export }
}

/// Text form of a JSON value: strings unquoted, `null` empty, others compact JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
