#[cfg(test)]
mod tests {
    use quarry_core::{AsValue, Clause, Config, Error, Operator, Value, ValueKind, ZERO_TIMESTAMP};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use time::macros::datetime;
    use uuid::Uuid;

    fn init_logs() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
    }

    fn decode<T: AsValue>(raw: Option<&str>) -> T {
        T::decode(raw.map(str::as_bytes), &Config::default()).expect("Scalars never fail")
    }

    #[test]
    fn integers() {
        init_logs();
        assert_eq!(decode::<i8>(Some("-128")), -128);
        assert_eq!(decode::<i32>(Some("2147483647")), i32::MAX);
        assert_eq!(decode::<u16>(Some("65535")), u16::MAX);
        assert_eq!(decode::<u64>(None), 0);
        assert_eq!(decode::<i8>(Some("128")), 0, "Out of range decodes to zero");
        assert_eq!(decode::<i64>(Some("12abc")), 0);
        assert_eq!(decode::<i64>(Some("")), 0);
        assert_eq!(5_i16.as_value(), Value::Int(5));
        assert_eq!(5_u16.as_value(), Value::UInt(5));
        assert_eq!(i16::KIND, ValueKind::Int { bits: 16 });
        assert_ne!(Value::Int(0), Value::UInt(0));
    }

    #[test]
    fn malformed_scalars_decode_to_zero() {
        init_logs();
        let long = "x".repeat(600);
        assert_eq!(decode::<i32>(Some(&long)), 0);
        assert_eq!(decode::<u64>(Some("-1")), 0);
        assert_eq!(decode::<f64>(Some(&long)), 0.0);
        assert_eq!(decode::<Decimal>(Some("1.2.3")), Decimal::ZERO);
        assert_eq!(decode::<Uuid>(Some(&long)), Uuid::nil());
        assert_eq!(
            decode::<time::PrimitiveDateTime>(Some(&long)),
            ZERO_TIMESTAMP
        );
        let invalid = [0xff_u8, 0xfe, b'1'];
        assert_eq!(
            i16::decode(Some(invalid.as_slice()), &Config::default()).expect("Lossy"),
            0
        );
    }

    #[test]
    fn scalars() {
        assert_eq!(decode::<f64>(Some("3.25")), 3.25);
        assert_eq!(decode::<f32>(Some("nope")), 0.0);
        assert!(decode::<bool>(Some("true")));
        assert!(decode::<bool>(Some("1")));
        assert!(!decode::<bool>(Some("0")));
        assert!(!decode::<bool>(None));
        assert_eq!(decode::<String>(None), "");
        assert_eq!(decode::<String>(Some("héllo")), "héllo");
        assert_eq!(decode::<Decimal>(Some("12.50")), Decimal::new(1250, 2));
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").expect("Valid uuid");
        assert_eq!(
            decode::<Uuid>(Some("67e55044-10b1-426f-9247-bb680e5fe0c8")),
            id
        );
        assert_eq!(
            Uuid::decode(Some(id.as_bytes().as_slice()), &Config::default()).expect("Binary uuid"),
            id
        );
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            decode::<time::PrimitiveDateTime>(Some("2024-02-29 23:59:58")),
            datetime!(2024-02-29 23:59:58)
        );
        assert_eq!(
            decode::<time::PrimitiveDateTime>(Some("yesterday")),
            ZERO_TIMESTAMP
        );
        let config = Config::default()
            .with_datetime_format("[day]/[month]/[year] [hour]:[minute]:[second]")
            .expect("Valid format");
        assert_eq!(
            time::PrimitiveDateTime::decode(Some(b"29/02/2024 23:59:58".as_slice()), &config)
                .expect("Timestamps never fail"),
            datetime!(2024-02-29 23:59:58)
        );
        assert!(matches!(
            Config::default().with_datetime_format("[nonsense"),
            Err(Error::Extraction(..))
        ));
    }

    #[test]
    fn nullable_and_structured() {
        assert_eq!(decode::<Option<i32>>(None), None);
        assert_eq!(decode::<Option<i32>>(Some("4")), Some(4));
        assert_eq!(None::<i32>.as_value(), Value::Null);
        assert!(<Option<String>>::NULLABLE);
        assert_eq!(decode::<Vec<u8>>(Some("[1,2]")), [1, 2]);
        assert_eq!(decode::<Vec<u8>>(None), Vec::<u8>::new());
        let map = decode::<HashMap<String, i32>>(Some(r#"{"a":1}"#));
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(
            vec!["x".to_string()].as_value(),
            Value::Json(serde_json::json!(["x"]))
        );
        let error = Vec::<u8>::decode(Some(b"{".as_slice()), &Config::default())
            .expect_err("Invalid JSON must fail");
        assert!(matches!(error, Error::Scan { .. }));
        assert_eq!(serde_json::Value::Null.as_value(), Value::Null);
    }

    #[test]
    fn literals() {
        assert_eq!(
            ValueKind::Int { bits: 32 }.parse_literal(" -7 ").expect("Integer"),
            Value::Int(-7)
        );
        assert_eq!(
            ValueKind::Boolean.parse_literal("TRUE").expect("Boolean"),
            Value::Boolean(true)
        );
        assert_eq!(
            ValueKind::Varchar.parse_literal(" - ").expect("Text"),
            Value::Varchar(" - ".into())
        );
        assert_eq!(
            ValueKind::Map.parse_literal("{}").expect("Map"),
            ValueKind::Map.zero()
        );
        assert!(ValueKind::UInt { bits: 8 }.parse_literal("-1").is_err());
        assert_eq!(ValueKind::Json.zero(), Value::Null);
        assert_eq!(
            ValueKind::Timestamp.zero(),
            Value::Timestamp(datetime!(0001-01-01 0:00))
        );
    }

    #[test]
    fn clauses() {
        let clause = Clause::new(
            Operator::Or,
            "`ID` IN (,,,,)",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        );
        assert_eq!(clause.template, "`ID` IN (?, ?, ?)");
        assert_eq!(clause.values.len(), 3);
        let clause = Clause::new(Operator::And, "`A`=?", vec![Value::Int(1)]);
        assert_eq!(clause.template, "`A`=?");
        assert_eq!(Operator::default().to_string(), "AND");
    }

    #[test]
    fn display() {
        assert_eq!(Value::Varchar("ok".into()).to_string(), "'ok'");
        assert_eq!(Value::Null.to_string(), "NULL");
        let long = "a".repeat(600);
        let shown = Value::Varchar(long).to_string();
        assert!(shown.ends_with("...'"));
        assert!(shown.len() < 510);
    }
}
