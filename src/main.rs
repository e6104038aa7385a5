use actix::{Actor, ActorContext, Addr, Handler, Message, StreamHandler};
use actix_files::NamedFile;
use actix_web::{dev::Server, get, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use anyhow::{anyhow, Result};
use chrono::Utc;
use knobd::{
    config::{Config, Source},
    gpio::{Direction, Pin},
    input::{EncoderSource, GpioEncoder, PinPair, RelayEncoder, Tracker},
    metrics,
    relay::Relay,
    shutdown::ShutdownButton,
};
use linux_embedded_hal::I2cdev;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

// Reset pulse for the encoder controller and the time it needs to boot
const RELAY_RESET_PULSE: Duration = Duration::from_millis(100);
const RELAY_BOOT_TIME: Duration = Duration::from_millis(2000);

#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize)]
pub struct EncoderStatus {
    pub position: i64,
    pub detents: u64,
    pub invalid_transitions: u64,
    pub stopped: bool, // Push button pressed, no more updates
    pub timestamp: i64,
}

#[derive(Message, Serialize)]
#[rtype(result = "()")]
struct EncoderStatusMessage {
    pub status: EncoderStatus,
}

/// Websocket session that receives every position change
struct EncoderStatusActor;

impl Actor for EncoderStatusActor {
    type Context = ws::WebsocketContext<Self>;
}

impl Handler<EncoderStatusMessage> for EncoderStatusActor {
    type Result = ();

    fn handle(&mut self, msg: EncoderStatusMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => error!("could not serialize status: {}", e),
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for EncoderStatusActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => (),
        }
    }
}

type Listeners = Arc<Mutex<Vec<Addr<EncoderStatusActor>>>>;

struct AppState {
    status: Arc<Mutex<EncoderStatus>>,
    listeners: Listeners,
}

#[get("/")]
async fn index() -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(Path::new("static/index.html"))?)
}

#[get("/api/status")]
async fn get_status(data: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let status = *lock(&data.status);
    Ok(HttpResponse::Ok().json(status))
}

// Upgrades the connection to a websocket and registers it as a listener.
// The current status is sent right away.
#[get("/api/ws")]
async fn status_updates(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> actix_web::Result<HttpResponse, Error> {
    let (actor, resp) = ws::start_with_addr(EncoderStatusActor {}, &req, stream)?;
    let status = *lock(&data.status);
    actor.do_send(EncoderStatusMessage { status });
    lock(&data.listeners).push(actor);
    info!("Listener connected");
    Ok(resp)
}

#[get("/metrics")]
async fn get_metrics() -> actix_web::Result<HttpResponse> {
    let text = metrics::gather().map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(text))
}

// Status is plain data, still valid behind a poisoned lock
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn open_source(config: &Config) -> Result<Box<dyn EncoderSource + Send>> {
    match config.source {
        Source::Gpio => {
            let phases = PinPair {
                a: Pin::input(config.pin_a)?,
                b: Pin::input(config.pin_b)?,
            };
            let push = config.pin_push.map(Pin::input).transpose()?;
            info!(
                "Reading encoder on GPIO {} and {}, push button {:?}",
                config.pin_a, config.pin_b, config.pin_push
            );
            Ok(Box::new(GpioEncoder::new(phases, push, config.active_low)?))
        }
        Source::Relay => {
            if let Some(pin) = config.pin_relay_reset {
                let reset = Pin::new(pin);
                reset.export()?.set_direction(Direction::High)?;
                info!("Resetting encoder controller via GPIO {}", pin);
                reset.pulse_low(RELAY_RESET_PULSE)?;
                thread::sleep(RELAY_BOOT_TIME);
            }
            let i2c = I2cdev::new(&config.i2c_bus)
                .map_err(|e| anyhow!("could not open {}: {:?}", config.i2c_bus, e))?;
            info!(
                "Reading encoder controller at {:#04x} on {}",
                config.i2c_address, config.i2c_bus
            );
            Ok(Box::new(RelayEncoder::new(Relay::new(i2c, config.i2c_address))))
        }
    }
}

fn publish(status: &Mutex<EncoderStatus>, listeners: &Listeners, update: EncoderStatus) {
    *lock(status) = update;
    let mut listeners = lock(listeners);
    listeners.retain(|listener| listener.connected());
    for listener in listeners.iter() {
        listener.do_send(EncoderStatusMessage { status: update });
    }
}

// Poll the encoder until its push button is pressed
fn track(
    mut source: Box<dyn EncoderSource + Send>,
    interval: Duration,
    status: Arc<Mutex<EncoderStatus>>,
    listeners: Listeners,
) {
    let mut tracker = Tracker::new();
    let mut failing = false;
    let snapshot = |tracker: &Tracker, source: &dyn EncoderSource| EncoderStatus {
        position: tracker.position(),
        detents: source.ticks().unwrap_or_else(|| tracker.detents()),
        invalid_transitions: source.invalid_transitions(),
        stopped: tracker.stopped(),
        timestamp: Utc::now().timestamp_millis(),
    };

    while !tracker.stopped() {
        match source.read() {
            Ok(reading) => {
                if failing {
                    info!("Encoder readable again");
                    failing = false;
                }
                if let Some(position) = tracker.update(reading) {
                    info!("Position {}", position);
                    metrics::record_change(reading.change, position);
                    publish(&status, &listeners, snapshot(&tracker, &*source));
                }
            }
            Err(e) => {
                if !failing {
                    warn!("Could not read encoder: {:#}", e);
                    failing = true;
                }
            }
        }
        metrics::record_invalid(source.invalid_transitions());
        thread::sleep(interval);
    }

    metrics::BUTTON_PRESSES.inc();
    publish(&status, &listeners, snapshot(&tracker, &*source));
}

fn stop_server(server: Server) {
    info!("Stopping HTTP server");
    let mut system = actix::System::new("knobd-stop");
    system.block_on(server.stop(true));
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;
    info!("Configuration {:?}", config);

    if let Some(pin) = config.pin_shutdown {
        let button = ShutdownButton::new(
            Pin::input(pin)?,
            config.active_low,
            config.shutdown_interval(),
            &config.shutdown_command,
        );
        info!("Listening for shutdown button on GPIO {}", pin);
        thread::spawn(move || {
            if let Err(e) = button.watch() {
                error!("Shutdown failed: {:#}", e);
            }
        });
    }

    let source = open_source(&config)?;
    let status = Arc::new(Mutex::new(EncoderStatus {
        timestamp: Utc::now().timestamp_millis(),
        ..EncoderStatus::default()
    }));
    let listeners: Listeners = Arc::new(Mutex::new(Vec::new()));

    let server = {
        let status = status.clone();
        let listeners = listeners.clone();
        HttpServer::new(move || {
            let state = web::Data::new(AppState {
                status: status.clone(),
                listeners: listeners.clone(),
            });
            App::new()
                .app_data(state)
                .service(index)
                .service(get_status)
                .service(status_updates)
                .service(get_metrics)
        })
        .bind(&config.bind)?
        .run()
    };
    info!("Serving encoder status on {}", config.bind);

    let interval = config.poll_interval();
    let handle = server.clone();
    thread::spawn(move || {
        track(source, interval, status, listeners);
        stop_server(handle);
    });

    server.await?;
    Ok(())
}
