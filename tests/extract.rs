#[cfg(test)]
mod tests {
    use quarry::{Error, Growable, Model, Value, ValueKind, extract};
    use std::collections::BTreeMap;

    #[derive(Model, Default, Debug)]
    #[quarry(table = "PERSON")]
    struct Person {
        #[quarry(col = "ID", index)]
        id: u64,
        #[quarry(col = "NAME")]
        name: String,
        #[quarry(col = "NICK")]
        nick: Option<String>,
        #[quarry(omit)]
        _cached: bool,
        #[quarry(col = "LEVEL", as_null = "-1", alt = 1)]
        level: i32,
        #[quarry(col = "NICKNAME.VALUE")]
        nickname: String,
        #[quarry(json = "DATA.tags")]
        tags: Vec<String>,
        #[quarry(col = "SETTINGS")]
        settings: BTreeMap<String, i32>,
    }

    #[test]
    fn fields_in_declaration_order() {
        let person = Person::default();
        let descriptor = extract(&person).expect("Person must be extracted");
        assert_eq!(descriptor.table, "PERSON");
        let names: Vec<_> = descriptor.fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            ["id", "name", "nick", "level", "nickname", "tags", "settings"]
        );
        let slots: Vec<_> = descriptor.fields.iter().map(|f| f.value_slot).collect();
        assert_eq!(slots, (0..7).collect::<Vec<_>>());
        assert_eq!(descriptor.index_fields, [0]);
        assert!(!descriptor.query_only);
        assert!(!descriptor.variable_length);
        assert_eq!(descriptor.row_count(), 1);
    }

    #[test]
    fn columns_and_tables() {
        let person = Person::default();
        let descriptor = extract(&person).expect("Person must be extracted");
        let field = |name: &str| {
            descriptor
                .fields
                .iter()
                .find(|f| f.name == name)
                .expect("The field is registered")
        };
        assert_eq!(field("id").column, "ID");
        assert_eq!(field("id").table, "PERSON");
        assert_eq!(field("nickname").column, "VALUE");
        assert_eq!(field("nickname").table, "NICKNAME");
        assert!(!descriptor.owns(field("nickname")));
        assert_eq!(field("tags").column, "DATA");
        assert_eq!(field("tags").json_path, Some("tags"));
        assert_eq!(field("tags").table, "PERSON");
        assert_eq!(field("settings").kind, ValueKind::Map);
    }

    #[test]
    fn null_sentinels() {
        let person = Person::default();
        let descriptor = extract(&person).expect("Person must be extracted");
        let sentinels: Vec<_> = descriptor
            .fields
            .iter()
            .map(|f| f.null_sentinel.clone())
            .collect();
        assert_eq!(
            sentinels,
            [
                Value::UInt(0),
                Value::Varchar("".into()),
                Value::Null,
                Value::Int(-1),
                Value::Varchar("".into()),
                Value::Json(serde_json::json!([])),
                Value::Json(serde_json::json!({})),
            ]
        );
        assert_eq!(descriptor.fields[3].alt_value, Some(Value::Int(1)));
        assert!(descriptor.fields[2].nullable);
    }

    #[test]
    fn empty_destinations() {
        let mut people: Vec<Person> = Vec::new();
        assert!(matches!(extract(&people), Err(Error::EmptyDataset)));
        assert!(matches!(extract(&mut people), Err(Error::EmptyDataset)));
        assert!(matches!(
            extract(Growable(&people)),
            Err(Error::NotAddressable)
        ));
        let descriptor = extract(Growable(&mut people)).expect("A growable vector is valid");
        assert!(descriptor.variable_length);
        assert_eq!(descriptor.row_count(), 0);
        assert!(
            Error::EmptyDataset.is_extraction() && Error::NotAddressable.is_extraction()
        );
    }

    #[test]
    fn malformed_literal() {
        #[derive(Model, Default)]
        struct Broken {
            #[quarry(alt = "twelve")]
            value: i32,
        }
        let broken = Broken::default();
        let Err(Error::Extraction(message)) = extract(&broken) else {
            panic!("The literal is expected to be rejected");
        };
        assert!(message.starts_with("field `value`"), "{message}");
    }

    #[test]
    fn raw_and_no_from() {
        #[derive(Model, Default)]
        struct Clock {
            #[quarry(col = "NOW()", raw, no_from)]
            now: String,
        }
        let clock = Clock::default();
        let descriptor = extract(&clock).expect("Clock must be extracted");
        assert!(descriptor.query_only);
        assert_eq!(descriptor.table, "");
        assert_eq!(descriptor.fields[0].column, "NOW()");
        assert!(descriptor.fields[0].raw);
    }

    #[test]
    fn declared_filters_and_joins() {
        #[derive(Model, Default)]
        #[quarry(table = "EMPLOYEE")]
        struct Employee {
            #[quarry(col = "ID", index, join = "JOIN `A` ON `A`.`ID`=`EMPLOYEE`.`A_ID`")]
            id: u64,
            #[quarry(col = "DELETED", filter = "`DELETED`=0", join = "JOIN `A` ON `A`.`ID`=`EMPLOYEE`.`A_ID`")]
            deleted: bool,
            #[quarry(col = "NAME", count_on = "DISTINCT `NAME`")]
            name: String,
        }
        let employee = Employee::default();
        let descriptor = extract(&employee).expect("Employee must be extracted");
        assert_eq!(descriptor.joins.len(), 2, "Joins are not deduplicated");
        assert_eq!(descriptor.static_wheres, ["`DELETED`=0"]);
        assert_eq!(descriptor.count_expr, Some("DISTINCT `NAME`"));
    }

    #[test]
    fn index_with_and_retarget() {
        let person = Person::default();
        let mut descriptor = extract(&person).expect("Person must be extracted");
        descriptor.index_with(1).expect("There is a field at position 1");
        descriptor.index_with(1).expect("Promoting twice is harmless");
        assert_eq!(descriptor.index_fields, [0, 1]);
        assert!(matches!(
            descriptor.index_with(42),
            Err(Error::Extraction(..))
        ));
        descriptor.retarget("PERSON_ARCHIVE");
        assert_eq!(descriptor.table, "PERSON_ARCHIVE");
        assert_eq!(descriptor.fields[0].table, "PERSON_ARCHIVE");
        assert_eq!(descriptor.fields[4].table, "NICKNAME");
    }
}
