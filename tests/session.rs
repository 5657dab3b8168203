#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use quarry::{
        Config, Error, Growable, Model, Operator, RowsAffected, Session, Value,
    };
    use quarry_mock::{Call, MockConnection, init_logs, text_row};
    use std::panic::AssertUnwindSafe;
    use time::macros::datetime;

    #[derive(Model, Default, Debug, Clone, PartialEq)]
    #[quarry(table = "PERSON")]
    struct Person {
        #[quarry(col = "ID", index)]
        id: u64,
        #[quarry(col = "NAME")]
        name: String,
        #[quarry(col = "AGE")]
        age: i32,
    }

    #[derive(Model, Default, Debug)]
    #[quarry(table = "EVENT")]
    struct Event {
        #[quarry(col = "ID", index)]
        id: u64,
        #[quarry(col = "AT")]
        at: Option<time::PrimitiveDateTime>,
        #[quarry(col = "NOTE")]
        note: Option<String>,
        #[quarry(col = "TAGS")]
        tags: Vec<String>,
        #[quarry(col = "RATE")]
        rate: f64,
        #[quarry(col = "ACTIVE")]
        active: bool,
    }

    const INSERT_PERSON: &str = "INSERT INTO `PERSON` (`NAME`, `AGE`) VALUES (?, ?)";

    #[tokio::test]
    async fn insert_reports_the_driver_outcome() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_affected(RowsAffected {
            rows_affected: 1,
            last_affected_id: Some(41),
            warnings: 0,
        });
        let mut session = Session::new(connection.clone());
        let mut person = Person {
            name: "CC".into(),
            age: 30,
            ..Default::default()
        };
        let result = session.model(&mut person).insert().await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.last_insert_id, 41);
        assert_eq!(
            connection.calls(),
            [Call::Execute {
                sql: INSERT_PERSON.into(),
                params: vec![Value::Varchar("CC".into()), Value::Int(30)],
                statement: None,
                transaction: None,
            }]
        );
    }

    #[tokio::test]
    async fn driver_errors_are_returned() {
        init_logs();
        let connection = MockConnection::new();
        connection.fail_next("Duplicate entry");
        let mut session = Session::new(connection.clone());
        let person = Person {
            id: 1,
            ..Default::default()
        };
        let result = session.model(&person).delete().await;
        assert!(!result.is_ok());
        assert_eq!(result.affected_rows, 0);
        let Some(Error::Driver(e)) = result.error else {
            panic!("A driver error is expected");
        };
        assert_eq!(e.to_string(), "Duplicate entry");
        assert_eq!(connection.calls().len(), 1, "Driver errors are not retried");
    }

    #[tokio::test]
    async fn extraction_errors_are_deferred() {
        init_logs();
        let connection = MockConnection::new();
        let mut session = Session::new(connection.clone());
        let people: Vec<Person> = Vec::new();
        let result = session
            .model(&people)
            .filter(Operator::And, "`AGE`>?", [1])
            .insert()
            .await;
        assert!(matches!(result.error, Some(Error::EmptyDataset)));
        assert!(connection.calls().is_empty());
    }

    #[tokio::test]
    async fn query_into_growable_destination() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([
            text_row([Some("1"), Some("A"), Some("30")]),
            text_row([Some("2"), Some("B"), None]),
            text_row([Some("3"), None, Some("x")]),
        ]);
        let mut session = Session::new(connection.clone());
        let mut people = Vec::<Person>::new();
        let result = session
            .model(Growable(&mut people))
            .filter(Operator::And, "`AGE`>?", [18])
            .query()
            .await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.returned_rows, 3);
        assert_eq!(
            people,
            [
                Person {
                    id: 1,
                    name: "A".into(),
                    age: 30
                },
                Person {
                    id: 2,
                    name: "B".into(),
                    age: 0
                },
                Person {
                    id: 3,
                    name: "".into(),
                    age: 0
                },
            ]
        );
        let statements = connection.statements();
        assert_eq!(statements.len(), 1);
        assert!(!statements[0].contains("LIMIT"), "{}", statements[0]);
    }

    #[tokio::test]
    async fn query_into_fixed_destination() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([
            text_row([Some("1"), Some("A"), Some("30")]),
            text_row([Some("2"), Some("B"), Some("40")]),
            text_row([Some("3"), Some("C"), Some("50")]),
        ]);
        let mut session = Session::new(connection.clone());
        let mut people = vec![
            Person {
                id: 1,
                ..Default::default()
            },
            Person {
                id: 2,
                ..Default::default()
            },
        ];
        let result = session.model(&mut people).query().await;
        assert_eq!(result.returned_rows, 2);
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].name, "B");
        assert_eq!(people[1].age, 40);

        let result = session.model(&people).query().await;
        assert!(matches!(result.error, Some(Error::NotSettable)));
        assert_eq!(connection.statements().len(), 1);
    }

    #[tokio::test]
    async fn query_decodes_every_kind() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([text_row([
            Some("7"),
            Some("2025-03-04 05:06:07"),
            None,
            Some(r#"["a","b"]"#),
            Some("1.5"),
            Some("1"),
        ])]);
        let mut session = Session::new(connection.clone());
        let mut event = Event {
            id: 7,
            ..Default::default()
        };
        let result = session.model(&mut event).query().await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(event.at, Some(datetime!(2025-03-04 05:06:07)));
        assert_eq!(event.note, None);
        assert_eq!(event.tags, ["a", "b"]);
        assert_eq!(event.rate, 1.5);
        assert!(event.active);
    }

    #[tokio::test]
    async fn query_with_configured_datetime_format() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([text_row([
            Some("7"),
            Some("04/03/2025 05:06"),
            Some("n"),
            None,
            Some("0"),
            Some("0"),
        ])]);
        let config = Config::default()
            .with_datetime_format("[day]/[month]/[year] [hour]:[minute]")
            .expect("Valid format");
        let mut session = Session::with_config(connection, config);
        let mut event = Event {
            id: 7,
            ..Default::default()
        };
        let result = session.model(&mut event).query().await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(event.at, Some(datetime!(2025-03-04 05:06)));
        assert_eq!(event.note.as_deref(), Some("n"));
        assert!(event.tags.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_aborts_the_scan() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([
            text_row([Some("1"), None, None, Some("not json"), None, None]),
            text_row([Some("2"), None, None, Some("[]"), None, None]),
        ]);
        let mut session = Session::new(connection);
        let mut events = Vec::<Event>::new();
        let result = session.model(Growable(&mut events)).query().await;
        let Some(Error::Scan { column, .. }) = &result.error else {
            panic!("A scan error is expected, got {:?}", result.error);
        };
        assert_eq!(column, "TAGS");
        assert_eq!(result.returned_rows, 0);
        assert_eq!(events.len(), 1, "The failing row is the last one appended");
    }

    #[tokio::test]
    async fn count_rows() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_rows([text_row([Some("12")])]);
        let mut session = Session::new(connection.clone());
        let mut people = Vec::<Person>::new();
        let result = session
            .model(Growable(&mut people))
            .group_by("`AGE`")
            .count()
            .await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.returned_rows, 12);
        assert!(people.is_empty());
        assert_eq!(
            connection.statements(),
            ["SELECT COUNT(1) FROM (SELECT COUNT(1) FROM `PERSON` GROUP BY `AGE`) AS c"]
        );
    }

    #[tokio::test]
    async fn batch_mode_routes_insert() {
        init_logs();
        let connection = MockConnection::new();
        let mut session = Session::new(connection.clone());
        let template = Person::default();
        let result = session
            .model(&template)
            .batch_mode(true)
            .append_batch_value([("NAME", Value::from("A")), ("AGE", 1.into())])
            .insert()
            .await;
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(
            connection.statements(),
            ["INSERT INTO `PERSON` (`AGE`, `NAME`) VALUES (?, ?)"]
        );
    }

    #[tokio::test]
    async fn prepared_statements_are_shared_across_transactions() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let mut first = session.begin().await.expect("First transaction");
        let mut second = session.begin().await.expect("Second transaction");
        let a = first.prepare(INSERT_PERSON).await.expect("Prepare");
        let again = first.prepare(INSERT_PERSON).await.expect("Prepare");
        let b = second.prepare(INSERT_PERSON).await.expect("Prepare");
        assert_eq!(connection.prepare_count(), 1);
        assert_eq!(connection.bind_count(), 2);
        assert_eq!(a.id(), b.id());
        assert_eq!(again.transaction(), a.transaction());
        assert_ne!(a.transaction(), b.transaction());
        assert_eq!(session.shared_cache().len().await, 1);

        first.commit().await.expect("Commit");
        second.rollback().await.expect("Rollback");
        assert!(!first.is_transaction());
        assert!(matches!(first.commit().await, Err(Error::NoTransaction)));
        let plain = first.prepare(INSERT_PERSON).await.expect("Prepare");
        assert_eq!(plain.transaction(), None);
        assert_eq!(connection.prepare_count(), 1);
        assert_eq!(connection.bind_count(), 2);
    }

    #[tokio::test]
    async fn prepare_next_executes_prepared_handles() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let mut transaction = session.begin().await.expect("Transaction");
        for age in [30, 40] {
            let mut person = Person {
                name: "CC".into(),
                age,
                ..Default::default()
            };
            let result = transaction
                .model(&mut person)
                .prepare_next(true)
                .insert()
                .await;
            assert!(result.is_ok(), "{:?}", result.error);
        }
        transaction.commit().await.expect("Commit");
        assert_eq!(connection.prepare_count(), 1);
        assert_eq!(connection.bind_count(), 1);
        let executes: Vec<_> = connection
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Execute { .. }))
            .collect();
        assert_eq!(executes.len(), 2);
        assert!(executes.iter().all(|c| matches!(
            c,
            Call::Execute {
                statement: Some(1),
                transaction: Some(1),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn transaction_commits_on_success() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let mut person = Person {
            name: "A".into(),
            age: 1,
            ..Default::default()
        };
        let result = session
            .transaction(|tx| {
                async move {
                    let result = tx.model(&mut person).insert().await.into_result()?;
                    Ok(result.affected_rows)
                }
                .boxed()
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(connection.commit_count(), 1);
        assert_eq!(connection.rollback_count(), 0);
        assert!(matches!(
            connection.calls()[1],
            Call::Execute {
                transaction: Some(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let result: Result<(), Error> = session
            .transaction(|tx| {
                async move {
                    tx.execute("DELETE FROM `PERSON` WHERE `ID`=?", &[Value::UInt(1)])
                        .await?;
                    Err(Error::Composition("stop".into()))
                }
                .boxed()
            })
            .await;
        assert!(matches!(result, Err(Error::Composition(..))));
        assert_eq!(connection.commit_count(), 0);
        assert_eq!(connection.rollback_count(), 1);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_panic() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let outcome = AssertUnwindSafe(session.transaction(|_tx| {
            async move {
                if true {
                    panic!("Something went wrong");
                }
                Ok(())
            }
            .boxed()
        }))
        .catch_unwind()
        .await;
        assert!(outcome.is_err(), "The panic is resumed");
        assert_eq!(connection.begin_count(), 1);
        assert_eq!(connection.rollback_count(), 1);
        assert_eq!(connection.commit_count(), 0);
    }

    #[tokio::test]
    async fn clone_has_no_transaction() {
        init_logs();
        let connection = MockConnection::new();
        let session = Session::new(connection.clone());
        let transaction = session.begin().await.expect("Transaction");
        let cloned = transaction.clone();
        assert!(transaction.is_transaction());
        assert!(!cloned.is_transaction());
        cloned
            .execute("SELECT 1", &[])
            .await
            .expect("Execute on the connection");
        assert!(matches!(
            connection.calls().last(),
            Some(Call::Execute {
                transaction: None,
                ..
            })
        ));
        let row = cloned
            .query_row("SELECT 1", &[])
            .await
            .expect("Query on the connection");
        assert!(row.is_none());
    }
}
