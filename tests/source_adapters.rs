use chrono::{NaiveDate, TimeZone, Utc};
use legis_ingest::document::ExtensionValue;
use legis_ingest::error::IngestError;
use legis_ingest::fetch::{DateRange, DocumentFetcher, StaticFetcher};
use legis_ingest::sources::{CamaraProposicao, SenadoProcess};

#[test]
fn senado_record_maps_to_document() {
    let raw = r#"{
        "id": 158930,
        "sigla": "PL",
        "numero": "2338",
        "ano": 2023,
        "data_apresentacao": "2023-05-03T00:00:00",
        "descricao": "Projeto de Lei",
        "autor": "Senador Rodrigo Pacheco",
        "ementa": "Dispõe sobre o uso da Inteligência Artificial.",
        "situacao": "Em tramitação",
        "link_inteiro_teor": "https://legis.senado.leg.br/sdleg-getter/documento?dm=9347622"
    }"#;
    let process: SenadoProcess = serde_json::from_str(raw).unwrap();
    let doc = process.into_document().unwrap();

    assert_eq!(doc.source.as_str(), "senado");
    assert_eq!(doc.identity_key.as_str(), "158930");
    assert_eq!(doc.title, "Dispõe sobre o uso da Inteligência Artificial.");
    assert_eq!(doc.kind, "PL");
    assert_eq!(doc.authors.as_deref(), Some("Senador Rodrigo Pacheco"));
    assert_eq!(doc.published_at, Utc.with_ymd_and_hms(2023, 5, 3, 0, 0, 0).unwrap());
    assert!(doc.content.is_none());
    assert_eq!(doc.extensions.get_str("numero"), Some("2338"));
    assert_eq!(doc.extensions.get("ano"), Some(&ExtensionValue::Number(2023)));
    assert_eq!(doc.extensions.get_str("situacao"), Some("Em tramitação"));
}

#[test]
fn senado_record_without_id_uses_year_and_number() {
    let process = SenadoProcess {
        numero: serde_json::from_str("12").unwrap(),
        ano: serde_json::from_str("2024").unwrap(),
        descricao: Some("Requerimento".into()),
        ..SenadoProcess::default()
    };
    let doc = process.into_document().unwrap();
    assert_eq!(doc.identity_key.as_str(), "senado_2024_12");
    assert_eq!(doc.title, "Requerimento");
    assert_eq!(doc.kind, "UNKNOWN");
    assert_eq!(doc.publication_day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
}

#[test]
fn senado_record_without_any_identity_is_invalid() {
    let err = SenadoProcess::default().into_document().unwrap_err();
    assert!(matches!(err, IngestError::InvalidDocument(_)));
}

#[test]
fn camara_record_maps_to_document() {
    let raw = r#"{
        "id": 2270800,
        "uri": "https://dadosabertos.camara.leg.br/api/v2/proposicoes/2270800",
        "siglaTipo": "PEC",
        "numero": 45,
        "ano": 2019,
        "ementa": "Altera o Sistema Tributário Nacional.",
        "dataApresentacao": "2019-04-03T15:40"
    }"#;
    let proposicao: CamaraProposicao = serde_json::from_str(raw).unwrap();
    let doc = proposicao.into_document().unwrap();

    assert_eq!(doc.source.as_str(), "camara");
    assert_eq!(doc.identity_key.as_str(), "2270800");
    assert_eq!(doc.kind, "PEC");
    assert_eq!(doc.url, "https://dadosabertos.camara.leg.br/api/v2/proposicoes/2270800");
    assert_eq!(
        doc.published_at,
        Utc.with_ymd_and_hms(2019, 4, 3, 15, 40, 0).unwrap()
    );
    assert_eq!(doc.extensions.get_str("sigla"), Some("PEC"));
    assert_eq!(doc.extensions.get_str("numero"), Some("45"));
}

#[test]
fn camara_title_falls_back_to_placeholder() {
    let raw = r#"{"id": 1, "ementa": "", "dataApresentacao": "10/02/2024"}"#;
    let doc = serde_json::from_str::<CamaraProposicao>(raw)
        .unwrap()
        .into_document()
        .unwrap();
    assert_eq!(doc.title, "Sem título");
    assert_eq!(doc.publication_day(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
}

#[test]
fn camara_bad_date_is_invalid() {
    let raw = r#"{"id": 1, "dataApresentacao": "amanhã"}"#;
    let err = serde_json::from_str::<CamaraProposicao>(raw)
        .unwrap()
        .into_document()
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidDocument(_)));

    let missing = CamaraProposicao::default().into_document().unwrap_err();
    assert!(matches!(missing, IngestError::InvalidDocument(_)));
}

#[tokio::test]
async fn static_fetcher_filters_by_range_and_is_restartable() {
    let docs: Vec<_> = ["2024-01-10", "2024-02-10", "2024-03-10"]
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let raw = format!(r#"{{"id": {i}, "ementa": "E{i}", "dataApresentacao": "{date}"}}"#);
            serde_json::from_str::<CamaraProposicao>(&raw)
                .unwrap()
                .into_document()
                .unwrap()
        })
        .collect();
    let fetcher = StaticFetcher::new(docs);
    let range = DateRange::parse("2024-02-01", Some("2024-03-10")).unwrap();

    let first = fetcher.fetch(&range).await.unwrap();
    let keys: Vec<&str> = first.iter().map(|d| d.identity_key.as_str()).collect();
    assert_eq!(keys, vec!["1", "2"]);
    assert_eq!(fetcher.fetch(&range).await.unwrap(), first);
}

#[test]
fn inverted_range_is_a_configuration_error() {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let err = DateRange::new(start, end).unwrap_err();
    assert!(err.is_systemic());
}
