use std::{
    io,
    sync::{Arc, Mutex},
};

use faultline::{
    DefaultTraceFormatter, Dispatcher, ErrorCode, ExceptionRecord, Severity, StackFrame,
    TraceFormatter,
};
use faultline_tracing::{FaultlineLayer, SpanTraceFormatter, TracingSink, current_span_scope};
use tracing::Level;
use tracing_subscriber::{Registry, layer::SubscriberExt};

#[derive(Clone, Default)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_events(level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer({
            let writer = writer.clone();
            move || writer.clone()
        })
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    writer.contents()
}

fn quiet_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::with_options([("display_level", Severity::NONE)]).unwrap();
    dispatcher.set_output(Box::new(io::sink()));
    dispatcher
}

#[derive(Debug, thiserror::Error)]
#[error("connection reset")]
struct ConnectionReset;

#[test]
fn plain_messages_use_the_configured_level() {
    let output = capture_events(Level::TRACE, || {
        let mut dispatcher = quiet_dispatcher();
        dispatcher.set_logger(TracingSink::new());
        dispatcher
            .handle_error(ErrorCode::WARNING, "disk almost full", "fs.rs", 4)
            .unwrap();
    });
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("faultline"), "{output}");
    assert!(output.contains("Warning[2]: 'disk almost full' in fs.rs on line 4"), "{output}");
}

#[test]
fn level_can_be_lowered() {
    let output = capture_events(Level::INFO, || {
        let mut dispatcher = quiet_dispatcher();
        dispatcher.set_logger(TracingSink::with_level(Level::DEBUG));
        dispatcher
            .handle_error(ErrorCode::NOTICE, "hidden", "a.rs", 1)
            .unwrap();
    });
    assert!(!output.contains("hidden"), "{output}");
}

#[test]
fn exceptions_are_logged_as_errors_with_fields() {
    let output = capture_events(Level::TRACE, || {
        let mut dispatcher = quiet_dispatcher();
        dispatcher.set_logger(TracingSink::with_level(Level::INFO));
        let exception = ExceptionRecord::from_error(&ConnectionReset).with_code(104);
        dispatcher.handle_exception(&exception).unwrap();
    });
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("ConnectionReset"), "{output}");
    assert!(output.contains("exception.code=104"), "{output}");
    assert!(output.contains("'connection reset'"), "{output}");
}

#[test]
fn span_scope_is_appended_to_traces() {
    let subscriber = Registry::default().with(FaultlineLayer);
    tracing::subscriber::with_default(subscriber, || {
        let formatter = SpanTraceFormatter::new(DefaultTraceFormatter);
        assert_eq!(formatter.format_trace(&[]), "");

        let request = tracing::info_span!("request", id = 7, user = tracing::field::Empty);
        let _request = request.enter();
        request.record("user", "ada");
        let _handler = tracing::debug_span!("handler").entered();

        assert_eq!(
            current_span_scope().as_deref(),
            Some("handler\nrequest{id=7 user=\"ada\"}")
        );
        let frames = [StackFrame::function("main")];
        assert_eq!(
            formatter.format_trace(&frames),
            "\nStack trace:\n#0 [internal function]: main()\nSpans:\nhandler\nrequest{id=7 user=\"ada\"}"
        );
    });
}

#[tracing::instrument(skip_all, fields(user_id = 42))]
fn checkout(formatter: &SpanTraceFormatter<DefaultTraceFormatter>) -> String {
    formatter.format_trace(&[StackFrame::function("pay")])
}

#[test]
fn instrumented_functions_show_their_fields() {
    let subscriber = Registry::default().with(FaultlineLayer);
    tracing::subscriber::with_default(subscriber, || {
        let formatter = SpanTraceFormatter::new(DefaultTraceFormatter);
        assert_eq!(
            checkout(&formatter),
            "\nStack trace:\n#0 [internal function]: pay()\nSpans:\ncheckout{user_id=42}"
        );
    });
}

#[test]
fn spans_reach_the_dispatched_message() {
    let subscriber = Registry::default().with(FaultlineLayer);
    let messages = Arc::new(Mutex::new(Vec::new()));
    tracing::subscriber::with_default(subscriber, || {
        let mut dispatcher = quiet_dispatcher();
        dispatcher
            .set_trace_formatter(SpanTraceFormatter::new(DefaultTraceFormatter))
            .set_logger(faultline::sink::from_fn({
                let messages = Arc::clone(&messages);
                move |message: &str, _exception| {
                    messages.lock().unwrap().push(message.to_owned());
                    Ok(())
                }
            }));

        let _span = tracing::info_span!("checkout", cart = 12).entered();
        dispatcher
            .handle_error(ErrorCode::USER_WARNING, "empty cart", "cart.rs", 30)
            .unwrap();
    });
    assert_eq!(
        messages.lock().unwrap().as_slice(),
        ["User Warning[512]: 'empty cart' in cart.rs on line 30\nSpans:\ncheckout{cart=12}"]
    );
}

#[test]
fn no_span_outside_registry() {
    assert_eq!(current_span_scope(), None);
}
