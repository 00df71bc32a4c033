//! Tests against a live PostgreSQL server.
//!
//! Set `DATABASE_URL` (e.g. `postgres://postgres@localhost/postgres`) to run
//! these; without it every test returns early.

use std::env;

use pglink::{into_vec, Connection, Kind, Param, ParamFormat, Request, ResponseHandler};

async fn get_conn() -> Option<Connection> {
    let url = env::var("DATABASE_URL").ok()?;
    Some(Connection::open_url(&url).await.expect("failed to connect"))
}

pglink::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Count {
        amount: i64,
    }
}

#[tokio::test]
async fn create_insert_select_delete_drop() {
    let Some(mut conn) = get_conn().await else {
        return;
    };

    let mut req = Request::new();
    req.add_query(
        "CREATE TABLE IF NOT EXISTS pglink_cisdd (id bigserial primary key, name text not null, postal_code integer)",
        &[],
    )
    .unwrap();
    conn.exec_ignore(&req).await.unwrap();

    let mut insert_req = Request::new();
    for i in 0..15 {
        insert_req
            .add_query(
                "INSERT INTO pglink_cisdd (name, postal_code) VALUES ('Ernie', $1)",
                &[Param::I32(i)],
            )
            .unwrap();
    }
    conn.exec_ignore(&insert_req).await.unwrap();

    let mut select_req = Request::new();
    select_req
        .add_query("SELECT count(*) AS amount FROM pglink_cisdd", &[])
        .unwrap();
    let mut counts: Vec<Count> = Vec::new();
    let mut handler = into_vec(&mut counts);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&select_req, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);
    assert_eq!(counts, vec![Count { amount: 15 }]);

    let mut cleanup = Request::new();
    cleanup.add_query("DELETE FROM pglink_cisdd", &[]).unwrap();
    cleanup.add_query("DROP TABLE pglink_cisdd", &[]).unwrap();
    conn.exec_ignore(&cleanup).await.unwrap();

    conn.close().await.unwrap();
}

pglink::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Day {
        d: pglink::Date,
    }
}

#[tokio::test]
async fn binary_date_roundtrip() {
    let Some(mut conn) = get_conn().await else {
        return;
    };

    let mut req = Request::new();
    req.add_query_with(
        "SELECT $1::text::date AS d",
        &[Param::Text("1977-06-21")],
        ParamFormat::SelectBest,
        pglink::FormatCode::Binary,
        0,
    )
    .unwrap();

    let mut days: Vec<Day> = Vec::new();
    let mut handler = into_vec(&mut days);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&req, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);

    assert_eq!(days.len(), 1);
    assert_eq!(days[0].d.to_string(), "1977-06-21");
}

pglink::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Id {
        id: i64,
    }
}

#[tokio::test]
async fn server_error_mid_pipeline_recovers() {
    let Some(mut conn) = get_conn().await else {
        return;
    };

    let mut setup = Request::new();
    setup
        .add_query(
            "CREATE TABLE IF NOT EXISTS pglink_errs (id bigint primary key)",
            &[],
        )
        .unwrap();
    conn.exec_ignore(&setup).await.unwrap();

    // One shared Sync: the duplicate key in step 2 skips step 3
    let mut req = Request::with_autosync(false);
    req.add_query("INSERT INTO pglink_errs (id) VALUES (1) RETURNING id", &[])
        .unwrap();
    req.add_query("INSERT INTO pglink_errs (id) VALUES (1) RETURNING id", &[])
        .unwrap();
    req.add_query("SELECT id FROM pglink_errs", &[]).unwrap();
    req.add_sync().unwrap();

    let mut rows1: Vec<Id> = Vec::new();
    let mut rows2: Vec<Id> = Vec::new();
    let mut rows3: Vec<Id> = Vec::new();
    let mut h1 = into_vec(&mut rows1);
    let mut h2 = into_vec(&mut rows2);
    let mut h3 = into_vec(&mut rows3);
    {
        let mut resp = pglink::response![&mut h1, &mut h2, &mut h3];
        let err = conn.exec(&req, &mut resp).await.unwrap_err();
        assert_eq!(err.kind(), Some(Kind::ExecServerError));
        assert_eq!(err.diag().unwrap().sqlstate.as_deref(), Some("23505"));
    }

    assert!(ResponseHandler::result(&h1).is_none());
    assert_eq!(
        ResponseHandler::result(&h2).unwrap().kind,
        Kind::ExecServerError
    );
    assert_eq!(ResponseHandler::result(&h3).unwrap().kind, Kind::StepSkipped);
    drop(h1);
    drop(h2);
    drop(h3);
    assert_eq!(rows1, vec![Id { id: 1 }]);

    // Still usable afterwards
    let mut check = Request::new();
    check.add_query("SELECT 1::bigint AS id", &[]).unwrap();
    let mut ids: Vec<Id> = Vec::new();
    let mut handler = into_vec(&mut ids);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&check, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);
    assert_eq!(ids, vec![Id { id: 1 }]);

    let mut cleanup = Request::new();
    cleanup.add_query("DROP TABLE pglink_errs", &[]).unwrap();
    conn.exec_ignore(&cleanup).await.unwrap();
}

#[tokio::test]
async fn prepared_statement_flow() {
    let Some(mut conn) = get_conn().await else {
        return;
    };

    let mut prepare = Request::new();
    prepare
        .add_prepare("SELECT $1::bigint * 2 AS id", "double_it", &[])
        .unwrap();
    conn.exec_ignore(&prepare).await.unwrap();

    let mut exec = Request::new();
    exec.add_execute("double_it", &[Param::Text("21")]).unwrap();
    let mut ids: Vec<Id> = Vec::new();
    let mut handler = into_vec(&mut ids);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&exec, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);
    assert_eq!(ids, vec![Id { id: 42 }]);

    let mut close = Request::new();
    close.add_close_statement("double_it").unwrap();
    conn.exec_ignore(&close).await.unwrap();
}
