/// Deserialization tests for parser-shaped transcript payloads
use kardex_ingest::ingestion::validate_payload;
use kardex_ingest::models::KardexPayload;
use serde_json::json;

fn parser_output(ingles: serde_json::Value) -> serde_json::Value {
    json!({
        "ok": true,
        "alumno": {
            "expediente": "219200123",
            "alumno": "ANA MARÍA LÓPEZ PÉREZ",
            "plan": "2182",
            "programa": "INGENIERÍA EN SISTEMAS DE INFORMACIÓN",
            "estatus": "A",
            "ingles": ingles
        },
        "materias": [
            { "codigo": "4110", "nombre": "Programación I", "cr": 8, "e1": "", "e2": "",
              "ord": 85.0, "reg": null, "cic": "2231", "bajas": 0 }
        ],
        "resumen": { "promedios": { "kardex": 85.0 }, "creditos": { "APR": 8 } }
    })
}

#[cfg(test)]
mod english_block_tests {
    use super::*;

    #[test]
    fn float_level_with_extra_fields_is_accepted() {
        let payload: KardexPayload = serde_json::from_value(parser_output(json!({
            "estado": "ACREDITADO",
            "nivel": 5.0,
            "maximo_pdf": 7.0,
            "requerido_carrera": 5.0,
            "maximo_carrera": 7.0,
            "cumple_requisito": true
        })))
        .unwrap();

        let english = payload.alumno.ingles.as_ref().unwrap();
        assert_eq!(english.nivel, Some(5.0));
        assert_eq!(english.extra["estado"], "ACREDITADO");
        assert!(validate_payload(&payload).is_ok());
    }

    #[test]
    fn fractional_and_integer_levels_are_accepted() {
        let payload: KardexPayload =
            serde_json::from_value(parser_output(json!({ "nivel": 4.5 }))).unwrap();
        assert_eq!(payload.alumno.ingles.unwrap().nivel, Some(4.5));

        let payload: KardexPayload =
            serde_json::from_value(parser_output(json!({ "nivel": 3 }))).unwrap();
        assert_eq!(payload.alumno.ingles.unwrap().nivel, Some(3.0));
    }

    #[test]
    fn block_without_level_is_accepted() {
        let payload: KardexPayload =
            serde_json::from_value(parser_output(json!({ "estado": "NO ACREDITADO" }))).unwrap();
        assert_eq!(payload.alumno.ingles.unwrap().nivel, None);
    }
}

#[cfg(test)]
mod credit_validation_tests {
    use super::*;

    #[test]
    fn negative_credits_are_rejected() {
        let mut raw = parser_output(json!({ "nivel": 5.0 }));
        raw["materias"][0]["cr"] = json!(-8);
        let payload: KardexPayload = serde_json::from_value(raw).unwrap();
        assert!(validate_payload(&payload).is_err());
    }
}
