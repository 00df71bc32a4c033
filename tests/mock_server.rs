//! End-to-end tests against a scripted in-process server.
//!
//! A tokio task plays the PostgreSQL side: it consumes the startup packet,
//! authenticates the client, then for each expected request payload replies
//! with pre-built backend frames.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use pglink::{
    into_vec, ConnectParams, Connection, Kind, Param, ParamFormat, Phase, Request,
    ResponseHandler,
};

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![tag];
    buf.extend_from_slice(&((payload.len() + 4) as i32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn auth_ok_and_ready() -> Vec<u8> {
    let mut reply = frame(b'R', &0_i32.to_be_bytes());
    reply.extend_from_slice(&frame(b'S', b"server_version\x0016.1\0"));
    let mut key = 4321_u32.to_be_bytes().to_vec();
    key.extend_from_slice(&99_u32.to_be_bytes());
    reply.extend_from_slice(&frame(b'K', &key));
    reply.extend_from_slice(&frame(b'Z', b"I"));
    reply
}

fn row_description(cols: &[(&str, u32, u16)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(cols.len() as u16).to_be_bytes());
    for (name, type_oid, format) in cols {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&0_u32.to_be_bytes());
        payload.extend_from_slice(&0_i16.to_be_bytes());
        payload.extend_from_slice(&type_oid.to_be_bytes());
        payload.extend_from_slice(&(-1_i16).to_be_bytes());
        payload.extend_from_slice(&(-1_i32).to_be_bytes());
        payload.extend_from_slice(&format.to_be_bytes());
    }
    frame(b'T', &payload)
}

fn data_row(cols: &[&[u8]]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(cols.len() as u16).to_be_bytes());
    for col in cols {
        payload.extend_from_slice(&(col.len() as i32).to_be_bytes());
        payload.extend_from_slice(col);
    }
    frame(b'D', &payload)
}

fn command_complete(tag: &str) -> Vec<u8> {
    let mut payload = tag.as_bytes().to_vec();
    payload.push(0);
    frame(b'C', &payload)
}

fn ready(status: u8) -> Vec<u8> {
    frame(b'Z', &[status])
}

fn error_response(sqlstate: &str, constraint: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"SERROR\0");
    payload.extend_from_slice(format!("C{}\0", sqlstate).as_bytes());
    payload.extend_from_slice(b"Mduplicate key value violates unique constraint\0");
    payload.extend_from_slice(format!("n{}\0", constraint).as_bytes());
    payload.push(0);
    frame(b'E', &payload)
}

/// Spawn a scripted server. Each script entry is (request bytes to consume,
/// reply to send).
async fn spawn_server(script: Vec<(usize, Vec<u8>)>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();

        // Startup packet: untyped, length-prefixed
        let mut len = [0u8; 4];
        sock.read_exact(&mut len).await.unwrap();
        let mut rest = vec![0u8; i32::from_be_bytes(len) as usize - 4];
        sock.read_exact(&mut rest).await.unwrap();
        sock.write_all(&auth_ok_and_ready()).await.unwrap();

        for (expected, reply) in script {
            let mut buf = vec![0u8; expected];
            sock.read_exact(&mut buf).await.unwrap();
            if !reply.is_empty() {
                sock.write_all(&reply).await.unwrap();
            }
        }

        // Hold the socket open until the client goes away
        let mut tail = [0u8; 64];
        let _ = sock.read(&mut tail).await;
    });

    port
}

fn params(port: u16) -> ConnectParams {
    ConnectParams {
        hostname: "127.0.0.1".into(),
        port,
        username: "tester".into(),
        database: Some("testdb".into()),
        ..ConnectParams::default()
    }
}

pglink::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Count {
        amount: i64,
    }
}

#[tokio::test]
async fn connect_exec_pipeline() {
    // Two simple statements plus a typed select, pipelined in one request
    let mut setup_req = Request::new();
    setup_req
        .add_simple_query("CREATE TABLE items (id bigserial primary key, v integer)")
        .unwrap();
    setup_req
        .add_simple_query("INSERT INTO items (v) SELECT generate_series(1, 15)")
        .unwrap();

    let mut count_req = Request::new();
    count_req
        .add_query("SELECT count(*) AS amount FROM items", &[])
        .unwrap();

    let mut setup_reply = command_complete("CREATE TABLE");
    setup_reply.extend_from_slice(&ready(b'I'));
    setup_reply.extend_from_slice(&command_complete("INSERT 0 15"));
    setup_reply.extend_from_slice(&ready(b'I'));

    let mut count_reply = frame(b'1', b"");
    count_reply.extend_from_slice(&frame(b'2', b""));
    count_reply.extend_from_slice(&row_description(&[("amount", 20, 0)]));
    count_reply.extend_from_slice(&data_row(&[b"15"]));
    count_reply.extend_from_slice(&command_complete("SELECT 1"));
    count_reply.extend_from_slice(&ready(b'I'));

    let port = spawn_server(vec![
        (setup_req.payload().len(), setup_reply),
        (count_req.payload().len(), count_reply),
    ])
    .await;

    let mut conn = Connection::open(&params(port)).await.unwrap();
    assert_eq!(conn.phase(), Phase::ReadyForQuery);
    assert_eq!(conn.backend_key().unwrap().process_id(), 4321);

    conn.exec_ignore(&setup_req).await.unwrap();

    let mut counts: Vec<Count> = Vec::new();
    let mut handler = into_vec(&mut counts);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&count_req, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);

    assert_eq!(counts, vec![Count { amount: 15 }]);
    conn.close().await.unwrap();
}

pglink::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Day {
        d: pglink::Date,
    }
}

#[tokio::test]
async fn binary_date_result() {
    let mut req = Request::new();
    req.add_query_with(
        "SELECT $1::text::date AS d",
        &[Param::Text("1977-06-21")],
        ParamFormat::SelectBest,
        pglink::FormatCode::Binary,
        0,
    )
    .unwrap();

    let mut reply = frame(b'1', b"");
    reply.extend_from_slice(&frame(b'2', b""));
    reply.extend_from_slice(&row_description(&[("d", 1082, 1)]));
    reply.extend_from_slice(&data_row(&[&[0xFF, 0xFF, 0xDF, 0xDB]]));
    reply.extend_from_slice(&command_complete("SELECT 1"));
    reply.extend_from_slice(&ready(b'I'));

    let port = spawn_server(vec![(req.payload().len(), reply)]).await;
    let mut conn = Connection::open(&params(port)).await.unwrap();

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
    struct Num {
        n: i32,
    }
}

#[tokio::test]
async fn server_error_mid_pipeline() {
    // Three extended steps sharing one trailing Sync; the second one
    // violates a unique constraint
    let mut req = Request::with_autosync(false);
    req.add_query("INSERT INTO t (id) VALUES (1) RETURNING id", &[])
        .unwrap();
    req.add_query("INSERT INTO t (id) VALUES (1) RETURNING id", &[])
        .unwrap();
    req.add_query("SELECT 3 AS n", &[]).unwrap();
    req.add_sync().unwrap();

    let mut reply = frame(b'1', b"");
    reply.extend_from_slice(&frame(b'2', b""));
    reply.extend_from_slice(&row_description(&[("n", 23, 0)]));
    reply.extend_from_slice(&data_row(&[b"1"]));
    reply.extend_from_slice(&command_complete("INSERT 0 1"));
    reply.extend_from_slice(&error_response("23505", "t_pkey"));
    reply.extend_from_slice(&ready(b'I'));

    let mut select_req = Request::new();
    select_req.add_simple_query("SELECT 1 AS n").unwrap();
    let mut select_reply = row_description(&[("n", 23, 0)]);
    select_reply.extend_from_slice(&data_row(&[b"1"]));
    select_reply.extend_from_slice(&command_complete("SELECT 1"));
    select_reply.extend_from_slice(&ready(b'I'));

    let port = spawn_server(vec![
        (req.payload().len(), reply),
        (select_req.payload().len(), select_reply),
    ])
    .await;
    let mut conn = Connection::open(&params(port)).await.unwrap();

    let mut rows1: Vec<Num> = Vec::new();
    let mut rows2: Vec<Num> = Vec::new();
    let mut rows3: Vec<Num> = Vec::new();
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

    let err2 = ResponseHandler::result(&h2).unwrap();
    assert_eq!(err2.kind, Kind::ExecServerError);
    assert_eq!(err2.diag.constraint.as_deref(), Some("t_pkey"));

    assert_eq!(ResponseHandler::result(&h3).unwrap().kind, Kind::StepSkipped);
    drop(h1);
    drop(h2);
    drop(h3);
    assert_eq!(rows1, vec![Num { n: 1 }]);
    assert!(rows3.is_empty());

    // The connection resynchronized on ReadyForQuery and stays usable
    assert_eq!(conn.phase(), Phase::ReadyForQuery);
    let mut rows: Vec<Num> = Vec::new();
    let mut handler = into_vec(&mut rows);
    let mut resp = pglink::response![&mut handler];
    conn.exec(&select_req, &mut resp).await.unwrap();
    drop(resp);
    drop(handler);
    assert_eq!(rows, vec![Num { n: 1 }]);
}

#[tokio::test]
async fn cancellation_marks_connection_failed() {
    let mut req = Request::new();
    req.add_simple_query("SELECT pg_sleep(3600)").unwrap();

    // The server absorbs the request and never answers
    let port = spawn_server(vec![(req.payload().len(), Vec::new())]).await;
    let mut conn = Connection::open(&params(port)).await.unwrap();

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        conn.exec_ignore(&req),
    )
    .await;
    assert!(timed_out.is_err());

    // The dropped exec lost protocol sync
    let err = conn.exec_ignore(&req).await.unwrap_err();
    assert_eq!(err.kind(), Some(Kind::ConnectionUnusable));
    assert_eq!(conn.phase(), Phase::Failed);
}

#[tokio::test]
async fn connect_timeout_honored() {
    // An address that will not answer: bind a listener and never accept
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut p = params(port);
    p.connect_timeout = Some(std::time::Duration::from_millis(50));

    // Connect may succeed at TCP level but startup never completes
    let err = Connection::open(&p).await.unwrap_err();
    assert!(matches!(err, pglink::Error::Io(_)));
}
