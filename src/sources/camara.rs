use serde::{Deserialize, Serialize};

use super::{non_blank, title_from, Code, CAMARA};
use crate::document::{Document, Extensions};
use crate::error::IngestError;
use crate::fetch::parse_timestamp;
use crate::types::{IdentityKey, SourceTag};

/// One `proposicao` from the Câmara dos Deputados v2 API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CamaraProposicao {
    #[serde(default)]
    pub id: Option<Code>,
    #[serde(default)]
    pub sigla_tipo: Option<String>,
    #[serde(default)]
    pub numero: Option<Code>,
    #[serde(default)]
    pub ano: Option<Code>,
    #[serde(default)]
    pub ementa: Option<String>,
    #[serde(default)]
    pub descricao_tipo: Option<String>,
    #[serde(default)]
    pub data_apresentacao: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub uri_autores: Option<String>,
}

impl CamaraProposicao {
    pub fn into_document(self) -> Result<Document, IngestError> {
        let id = self
            .id
            .as_ref()
            .and_then(Code::as_key)
            .ok_or_else(|| IngestError::invalid("camara record has no id"))?;
        let raw_date = non_blank(&self.data_apresentacao).ok_or_else(|| {
            IngestError::invalid(format!("camara record {id} has no dataApresentacao"))
        })?;
        let published_at = parse_timestamp(raw_date)?;

        let mut extensions = Extensions::new();
        extensions.insert_opt_string("sigla", self.sigla_tipo.clone());
        extensions.insert_opt_string("numero", self.numero.as_ref().and_then(Code::as_key));
        if let Some(ano) = self.ano.as_ref().and_then(Code::as_number) {
            extensions.insert_number("ano", ano);
        }
        extensions.insert_opt_string("uri_autores", self.uri_autores.clone());

        Ok(Document::new(
            SourceTag::new(CAMARA),
            IdentityKey::new(id),
            title_from(&self.ementa, &self.descricao_tipo),
            self.uri.clone().unwrap_or_default(),
            published_at,
            non_blank(&self.sigla_tipo).unwrap_or("UNKNOWN"),
        )
        .with_extensions(extensions))
    }
}
