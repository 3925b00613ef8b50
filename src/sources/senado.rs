use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{non_blank, title_from, Code, SENADO};
use crate::document::{Document, Extensions};
use crate::error::IngestError;
use crate::fetch::parse_timestamp;
use crate::types::{IdentityKey, SourceTag};

/// One `materia` from the Senado open-data API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SenadoProcess {
    #[serde(default)]
    pub id: Option<Code>,
    #[serde(default)]
    pub sigla: Option<String>,
    #[serde(default)]
    pub numero: Option<Code>,
    #[serde(default)]
    pub ano: Option<Code>,
    #[serde(default)]
    pub data_apresentacao: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub autor: Option<String>,
    #[serde(default)]
    pub ementa: Option<String>,
    #[serde(default)]
    pub situacao: Option<String>,
    #[serde(default)]
    pub link_inteiro_teor: Option<String>,
}

impl SenadoProcess {
    /// Records without an `id` fall back to `senado_{ano}_{numero}`; records
    /// without a presentation date fall back to January 1st of `ano`.
    pub fn into_document(self) -> Result<Document, IngestError> {
        let ano = self.ano.as_ref().and_then(Code::as_number);
        let numero = self.numero.as_ref().and_then(Code::as_key);

        let identity = match (self.id.as_ref().and_then(Code::as_key), ano, &numero) {
            (Some(id), _, _) => id,
            (None, Some(ano), Some(numero)) => format!("senado_{ano}_{numero}"),
            _ => return Err(IngestError::invalid("senado record has no id or numero/ano")),
        };

        let published_at = match non_blank(&self.data_apresentacao) {
            Some(raw) => parse_timestamp(raw)?,
            None => {
                let day = ano
                    .and_then(|y| i32::try_from(y).ok())
                    .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                    .ok_or_else(|| {
                        IngestError::invalid(format!("senado record {identity} has no date"))
                    })?;
                Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
            }
        };

        let mut extensions = Extensions::new();
        extensions.insert_opt_string("sigla", self.sigla.clone());
        extensions.insert_opt_string("numero", numero);
        if let Some(ano) = ano {
            extensions.insert_number("ano", ano);
        }
        extensions.insert_opt_string("situacao", self.situacao.clone());

        let mut document = Document::new(
            SourceTag::new(SENADO),
            IdentityKey::new(identity),
            title_from(&self.ementa, &self.descricao),
            self.link_inteiro_teor.clone().unwrap_or_default(),
            published_at,
            non_blank(&self.sigla).unwrap_or("UNKNOWN"),
        )
        .with_extensions(extensions);
        if let Some(autor) = non_blank(&self.autor) {
            document = document.with_authors(autor);
        }
        Ok(document)
    }
}
