use micro_message::protocol::{HttpError, HttpMessage, HttpRequest, IncomingRequest, Request, Response};
use micro_message::stream::ByteStream;
use serde_json::Value;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const RAW_REQUEST: &str = "POST /users?notify=1 HTTP/1.1\r\n\
Host: 127.0.0.1:8080\r\n\
Content-Type: application/json\r\n\
Cookie: session=abc\r\n\
Content-Length: 30\r\n\r\n\
{\"name\":\"hello\",\"zip\":\"world\"}";

fn main() -> Result<(), HttpError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut headers = [httparse::EMPTY_HEADER; 16];
    let mut parsed = httparse::Request::new(&mut headers);
    let head_len = match parsed.parse(RAW_REQUEST.as_bytes()).expect("malformed request") {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => panic!("incomplete request"),
    };

    let body = ByteStream::from_bytes(&RAW_REQUEST.as_bytes()[head_len..]);
    let request = Request::try_from(parsed)?.with_body(body);

    let json: Value = serde_json::from_str(&request.body().to_string()).expect("body is not json");
    let request = IncomingRequest::from_request(request, [("REMOTE_ADDR", "127.0.0.1")])
        .with_cookie_params([("session", "abc")])
        .with_parsed_body(Some(json))?
        .with_attribute("handled_by", "inspect_request");

    info!(method = %request.method(), target = %request.request_target(), "received request");
    for (name, values) in request.headers() {
        info!(name = name.as_str(), values = ?values, "header");
    }
    info!(query = ?request.query_params(), cookies = ?request.cookie_params(), "params");
    info!(body = ?request.parsed_body(), "parsed body");

    let response = Response::new(201)?.with_header("Content-Type", "text/plain")?.with_body("created\r\n");
    info!(status = response.status(), reason = response.reason_phrase(), body = %response.body(), "response");

    let mut stream = response.body().lock();
    stream.close();
    info!(detached = stream.is_detached(), "response body closed");
    Ok(())
}
