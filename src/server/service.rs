use crate::sequence::SequenceCounter;
use crate::server::TicketFormat;
use bytes::Bytes;
use chrono::Local;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use log::debug;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Clone)]
pub struct TicketService {
    counter: Arc<SequenceCounter>,
    format: TicketFormat,
}

impl TicketService {
    pub fn new(counter: Arc<SequenceCounter>, format: TicketFormat) -> Self {
        TicketService { counter, format }
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Result<Response<Full<Bytes>>, Infallible> {
        let response = match (request.method(), request.uri().path()) {
            (&Method::GET, "/seq") => self.next_ticket(),
            (&Method::GET, "/seq/current") => self.current(),
            (_, "/seq") | (_, "/seq/current") => empty(StatusCode::METHOD_NOT_ALLOWED),
            _ => empty(StatusCode::NOT_FOUND),
        };

        Ok(response)
    }

    fn next_ticket(&self) -> Response<Full<Bytes>> {
        let seq = self.counter.increment();
        let ticket = self.format.format(&Local::now().date_naive(), seq);

        debug!("ticket issued: {}", ticket);

        json_body(json!({ "seq": ticket }).to_string())
    }

    fn current(&self) -> Response<Full<Bytes>> {
        json_body(json!({ "seq": self.counter.current() }).to_string())
    }
}

fn json_body(body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));

    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    response
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));

    *response.status_mut() = status;

    response
}
