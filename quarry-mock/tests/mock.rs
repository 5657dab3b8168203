#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use quarry_core::{
        Connection, Executor, Prepared, RawRow, RowsAffected, Transaction, Value,
    };
    use quarry_mock::{Call, MockConnection, init_logs, text_row};

    #[tokio::test]
    async fn replays_scripted_rows() {
        init_logs();
        let connection = MockConnection::new();
        connection
            .push_rows([text_row([Some("1"), None]), text_row([Some("2"), Some("b")])])
            .push_rows(Vec::<RawRow>::new());
        let rows: Vec<_> = connection
            .query("SELECT 1", &[])
            .try_collect()
            .await
            .expect("The scripted rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].column(0), Some(&b"1"[..]));
        assert_eq!(rows[0].column(1), None);
        assert_eq!(rows[1].column(1), Some(&b"b"[..]));
        let rows: Vec<_> = connection
            .query("SELECT 2", &[])
            .try_collect()
            .await
            .expect("An empty result set");
        assert!(rows.is_empty());
        assert_eq!(connection.statements(), ["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn scripted_outcomes_and_failures() {
        init_logs();
        let connection = MockConnection::new();
        connection.push_affected(RowsAffected {
            rows_affected: 3,
            last_affected_id: Some(7),
            warnings: 0,
        });
        let affected = connection
            .execute("DELETE FROM `T` WHERE `ID`=?", &[Value::Int(1)])
            .await
            .expect("The scripted outcome");
        assert_eq!(affected.rows_affected, 3);
        assert_eq!(affected.last_affected_id, Some(7));
        connection.fail_next("Connection reset");
        let error = connection
            .execute("DELETE FROM `T`", &[])
            .await
            .expect_err("The scripted failure");
        assert_eq!(error.to_string(), "Connection reset");
        let affected = connection
            .execute("DELETE FROM `T`", &[])
            .await
            .expect("The default outcome");
        assert_eq!(affected, RowsAffected::default());
        assert_eq!(
            connection.calls()[0],
            Call::Execute {
                sql: "DELETE FROM `T` WHERE `ID`=?".into(),
                params: vec![Value::Int(1)],
                statement: None,
                transaction: None,
            }
        );
    }

    #[tokio::test]
    async fn binds_prepared_statements() {
        init_logs();
        let connection = MockConnection::new();
        let prepared = connection
            .prepare("SELECT `A` FROM `T`")
            .await
            .expect("Prepared statement");
        let transaction = connection.begin().await.expect("Transaction");
        let bound = transaction.bind(&prepared).expect("Bound statement");
        assert_eq!(bound.id(), prepared.id());
        assert_eq!(bound.transaction(), Some(transaction.id()));
        assert_eq!(prepared.transaction(), None);
        bound.execute(&[]).await.expect("Execute");
        transaction.commit().await.expect("Commit");
        assert_eq!(connection.prepare_count(), 1);
        assert_eq!(connection.bind_count(), 1);
        assert_eq!(connection.begin_count(), 1);
        assert_eq!(connection.commit_count(), 1);
        assert_eq!(connection.rollback_count(), 0);
        assert!(matches!(
            connection.calls()[3],
            Call::Execute {
                statement: Some(1),
                transaction: Some(1),
                ..
            }
        ));
    }
}
