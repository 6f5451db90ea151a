use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use folio_telemetry::hooks::{
    ensure_auto_instrumentation, instrument_component, ComponentInstrumentation, ComponentOptions,
    FrameInstrumentation, FrameOptions,
};
use folio_telemetry::host::{
    Callback, Component, ComponentInstance, Element, ElementFactory, FnComponent, PropValue, Props,
    Renderer,
};
use folio_telemetry::props;
use folio_telemetry::telemetry::{global, snapshot_of, FilePreferenceStore, TelemetryBridge};
use folio_telemetry::{Telemetry, TelemetryConfig};

const STORE_PATH_ENV: &str = "FOLIO_TELEMETRY_STORE";
const FRAME_BUDGET_ENV: &str = "FOLIO_FRAME_BUDGET";
const DEFAULT_STORE_PATH: &str = ".folio-telemetry.json";

const HEADLINE: &str = "Building calm, fast interfaces";

const PROJECTS: &[(&str, &[&str])] = &[
    ("Hex Grid Playground", &["webgl", "instancing"]),
    ("Typewriter Kit", &["animation", "a11y"]),
    ("Render Telemetry", &["diagnostics", "hooks"]),
];

/// Title that types itself out and reports its own lifecycle.
struct TypewriterTitle {
    telemetry: Telemetry,
}

impl Component for TypewriterTitle {
    fn function_name(&self) -> Option<&str> {
        Some("HeroTypewriterTitle")
    }

    fn instantiate(self: Arc<Self>) -> Box<dyn ComponentInstance> {
        Box::new(TypewriterInstance {
            instrumentation: ComponentInstrumentation::new(&self.telemetry, "HeroTypewriterTitle"),
        })
    }
}

struct TypewriterInstance {
    instrumentation: ComponentInstrumentation,
}

impl ComponentInstance for TypewriterInstance {
    fn render(&mut self, props: &Props, factory: &ElementFactory) -> Vec<Element> {
        let typed = match props.get("typed") {
            Some(PropValue::Number(n)) => *n as usize,
            _ => 0,
        };
        let visible: String = HEADLINE.chars().take(typed).collect();
        let complete = typed >= HEADLINE.chars().count();

        let state_len = visible.chars().count();
        self.instrumentation.begin_render(
            ComponentOptions::new()
                .state(move || Ok(snapshot_of(json!({ "visibleChars": state_len }))))
                .track_values(move || Ok(snapshot_of(json!({ "complete": complete }))))
                .throttle_ms(500.0),
        );

        vec![factory.intrinsic("h1", props! { "children" => visible })]
    }

    fn committed(&mut self) {
        self.instrumentation.commit();
    }

    fn unmounting(&mut self) {
        self.instrumentation.unmount();
    }
}

fn build_page(telemetry: &Telemetry) -> Arc<dyn Component> {
    let typewriter: Arc<dyn Component> = Arc::new(TypewriterTitle {
        telemetry: telemetry.clone(),
    });
    telemetry.register_manual_instrumentation("HeroTypewriterTitle");

    let navigation: Arc<dyn Component> = Arc::new(FnComponent::new("Navigation", |_, factory| {
        ["home", "about", "projects", "contact"]
            .iter()
            .map(|section| factory.intrinsic("a", props! { "href" => format!("#{section}") }))
            .collect()
    }));

    let hero: Arc<dyn Component> = Arc::new(FnComponent::new("HeroSection", move |props, factory| {
        let typed = props.get("typed").cloned().unwrap_or(PropValue::Number(0.0));
        vec![factory.component(Arc::clone(&typewriter), props! { "typed" => typed })]
    }));

    let about: Arc<dyn Component> = Arc::new(FnComponent::new("AboutSection", |_, factory| {
        vec![factory.intrinsic("p", props! { "children" => "Engineer who likes small, sharp tools." })]
    }));

    let card: Arc<dyn Component> = Arc::new(FnComponent::new("ProjectCard", |props, factory| {
        let title = props.get("title").cloned().unwrap_or(PropValue::Null);
        vec![factory.intrinsic("article", props! { "title" => title })]
    }));

    let projects: Arc<dyn Component> = Arc::new(FnComponent::new("ProjectsSection", move |_, factory| {
        PROJECTS
            .iter()
            .enumerate()
            .map(|(i, (title, tags))| {
                let tags: Vec<PropValue> = tags.iter().map(|t| PropValue::from(*t)).collect();
                let published = Utc
                    .with_ymd_and_hms(2024, 3, 1 + i as u32, 9, 0, 0)
                    .single()
                    .map(PropValue::Date)
                    .unwrap_or(PropValue::Null);
                factory.component(
                    Arc::clone(&card),
                    props! {
                        "title" => *title,
                        "tags" => tags,
                        "published" => published,
                        "onSelect" => PropValue::Callback(Callback::new(|_| {})),
                    },
                )
            })
            .collect()
    }));

    let contact: Arc<dyn Component> = Arc::new(FnComponent::new("ContactSection", |_, factory| {
        vec![factory.intrinsic("form", props! { "children" => factory.intrinsic("input", props! { "name" => "email" }) })]
    }));

    let footer = instrument_component(
        telemetry,
        Arc::new(FnComponent::new("FooterContent", |_, factory| {
            vec![factory.intrinsic("footer", props! { "children" => "Made by hand" })]
        })),
        "Footer",
        None,
    );

    Arc::new(FnComponent::new("Home", move |props, factory| {
        let typed = props.get("typed").cloned().unwrap_or(PropValue::Number(0.0));
        vec![
            factory.component(Arc::clone(&navigation), props! {}),
            factory.component(Arc::clone(&hero), props! { "typed" => typed }),
            factory.component(Arc::clone(&about), props! {}),
            factory.component(Arc::clone(&projects), props! {}),
            factory.component(Arc::clone(&contact), props! {}),
            factory.component(Arc::clone(&footer), props! {}),
        ]
    }))
}

/// Reads console commands on a plain thread so a pending read never holds
/// up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_console(bridge: TelemetryBridge, cancel: CancellationToken) {
    let mut lines = spawn_stdin_reader();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => line,
        };

        let command = match line {
            Some(Ok(command)) => command,
            None => break,
            Some(Err(e)) => {
                warn!("console input failed: {e}");
                break;
            }
        };

        let outcome = match command.trim() {
            "enable" => bridge.enable().map(|()| true),
            "disable" => bridge.disable().map(|()| false),
            "toggle" => bridge.toggle(),
            "status" => Ok(bridge.get_enabled()),
            "quit" => {
                cancel.cancel();
                break;
            }
            "" => continue,
            other => {
                warn!("unknown command `{other}` (enable, disable, toggle, status, quit)");
                continue;
            }
        };

        match outcome {
            Ok(enabled) => info!(enabled, "telemetry switch"),
            Err(e) => warn!(enabled = bridge.enabled(), "telemetry switch not persisted: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TelemetryConfig::from_env()?;
    let store_path = std::env::var(STORE_PATH_ENV).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
    let frame_budget: Option<u64> = std::env::var(FRAME_BUDGET_ENV).ok().and_then(|v| v.parse().ok());

    let telemetry = Telemetry::builder()
        .config(config)
        .store(Arc::new(FilePreferenceStore::new(&store_path)))
        .build();
    global::install(telemetry.clone())?;

    info!(
        enabled = telemetry.is_logging_enabled(),
        store = %store_path,
        "portfolio session starting (console: enable | disable | toggle | status | quit)"
    );

    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let home = build_page(&telemetry);
    let mut root = renderer.mount(factory.component(Arc::clone(&home), props! { "typed" => 0 }));

    let cancel = CancellationToken::new();
    let console = tokio::spawn(run_console(telemetry.bridge(), cancel.clone()));

    let mut phase = 0.0_f64;
    let mut background = FrameInstrumentation::new(
        &telemetry,
        "Smooth3DBackground",
        |delta_ms: f64| {
            // stand-in for the hex grid update
            phase = (phase + delta_ms * 0.001).rem_euclid(std::f64::consts::TAU);
            phase.sin()
        },
        FrameOptions {
            track_interval: true,
            ..FrameOptions::default()
        },
    );

    let mut frames = tokio::time::interval(Duration::from_millis(16));
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut typewriter = tokio::time::interval(Duration::from_millis(120));
    typewriter.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frame_count: u64 = 0;
    let mut typed: usize = 0;
    let headline_len = HEADLINE.chars().count();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = &mut ctrl_c => break,
            _ = frames.tick() => {
                background.call(16.0);
                frame_count += 1;
                if frame_budget.is_some_and(|budget| frame_count >= budget) {
                    break;
                }
            }
            _ = typewriter.tick(), if typed < headline_len => {
                typed += 1;
                renderer.update(&mut root, props! { "typed" => typed });
            }
        }
    }

    renderer.unmount(root);
    cancel.cancel();
    if let Err(e) = console.await {
        warn!("console task ended abnormally: {e}");
    }

    info!(frames = frame_count, "portfolio session finished");
    Ok(())
}
