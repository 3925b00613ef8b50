//! Record models for the two Brazilian legislative APIs.
//!
//! Adapters turn API payloads into [`Document`](crate::document::Document)s.
//! Everything beyond the base fields is kept in the document's extensions.

pub mod camara;
pub mod senado;

use serde::{Deserialize, Serialize};

pub use camara::CamaraProposicao;
pub use senado::SenadoProcess;

pub const SENADO: &str = "senado";
pub const CAMARA: &str = "camara";

const UNTITLED: &str = "Sem título";

/// Numeric codes arrive as JSON numbers from one API and strings from the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Number(i64),
    Text(String),
}

impl Code {
    pub fn as_key(&self) -> Option<String> {
        match self {
            Code::Number(n) => Some(n.to_string()),
            Code::Text(s) if s.trim().is_empty() => None,
            Code::Text(s) => Some(s.trim().to_string()),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Code::Number(n) => Some(*n),
            Code::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn title_from(ementa: &Option<String>, descricao: &Option<String>) -> String {
    non_blank(ementa)
        .or_else(|| non_blank(descricao))
        .unwrap_or(UNTITLED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_through_descricao() {
        let ementa = Some("  ".to_string());
        let descricao = Some("Altera a Lei 1".to_string());
        assert_eq!(title_from(&ementa, &descricao), "Altera a Lei 1");
        assert_eq!(title_from(&None, &None), UNTITLED);
    }

    #[test]
    fn codes_accept_numbers_and_strings() {
        let codes: Vec<Code> = serde_json::from_str(r#"[42, "0042", ""]"#).unwrap();
        assert_eq!(codes[0].as_key().as_deref(), Some("42"));
        assert_eq!(codes[1].as_number(), Some(42));
        assert_eq!(codes[2].as_key(), None);
    }
}
