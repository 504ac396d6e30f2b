use cores::ipc::NO_CACHE_CONTROL;
use cores::settings::{LogLevel, Settings};
use image_handler::invocation_requests::InvocationHandler;
use image_handler::responses;
use image_handler::runtime_context::RuntimeContext;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::error;

fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(level.tracing_level())
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
}

// https://github.com/awslabs/aws-lambda-rust-runtime/tree/main/examples
#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            // keep answering so the gateway gets an envelope instead of a runtime error
            init_tracing(LogLevel::resolve(std::env::var("LOG_LEVEL").ok().as_deref()));
            error!("settings error: {:?}", error);
            let func = |_event: LambdaEvent<Value>| async {
                Ok::<_, Error>(responses::status_envelope(500, NO_CACHE_CONTROL))
            };
            return run(service_fn(func)).await;
        }
    };
    init_tracing(settings.log_level);
    let runtime_context = RuntimeContext::new(settings)?;
    let handler = InvocationHandler::new(&runtime_context);
    let func = |event: LambdaEvent<Value>| {
        let handler = handler.clone();
        async move { Ok::<_, Error>(handler.handle(event.payload).await) }
    };
    run(service_fn(func)).await
}
