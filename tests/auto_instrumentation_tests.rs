mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{detail_f64, harness, harness_with};
use folio_telemetry::hooks::{
    ensure_auto_instrumentation, instrument_component, AutoInstrumentor, ComponentInstrumentation,
    ComponentOptions,
};
use folio_telemetry::host::{
    sanitize_props, Callback, Component, ComponentInstance, Element, ElementFactory, ElementType,
    FnComponent, PropValue, Props, Renderer,
};
use folio_telemetry::{props, Telemetry, TelemetryConfig};
use serde_json::json;

fn component_of(element: &Element) -> Arc<dyn Component> {
    match &element.ty {
        ElementType::Component(component) => Arc::clone(component),
        ElementType::Intrinsic(tag) => panic!("expected a component element, got <{tag}>"),
    }
}

fn same(a: &Arc<dyn Component>, b: &Arc<dyn Component>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn card() -> Arc<dyn Component> {
    Arc::new(FnComponent::new("Card", |props, factory| {
        let title = props.get("title").cloned().unwrap_or(PropValue::Null);
        vec![factory.intrinsic("article", props! { "title" => title })]
    }))
}

#[test]
fn test_install_is_idempotent() {
    let h = harness(true);
    let factory = ElementFactory::new();

    assert!(ensure_auto_instrumentation(&factory, &h.telemetry));
    assert!(!ensure_auto_instrumentation(&factory, &h.telemetry), "Second install is a no-op");
    assert!(factory.is_intercepted());
}

#[test]
fn test_named_component_gets_one_cached_wrapper() {
    let h = harness(true);
    let factory = ElementFactory::new();
    let instrumentor = Arc::new(AutoInstrumentor::new(&h.telemetry));
    assert!(factory.install_interceptor(instrumentor.clone()));

    let original = card();
    let first = component_of(&factory.component(Arc::clone(&original), props! {}));
    let second = component_of(&factory.component(Arc::clone(&original), props! {}));

    assert!(!same(&first, &original));
    assert_eq!(first.display_name(), Some("Telemetry(Card)"));
    assert!(first.is_telemetry_wrapper());
    assert!(same(&first, &second), "Repeat creations reuse the wrapper");
    assert_eq!(instrumentor.wrapped_count(), 1);

    // Feeding the wrapper back in never double-wraps.
    let again = component_of(&factory.component(Arc::clone(&first), props! {}));
    assert!(same(&again, &first));
    assert_eq!(instrumentor.wrapped_count(), 1);
}

#[test]
fn test_skipped_components_pass_through() {
    let h = harness_with(TelemetryConfig {
        enabled_by_default: true,
        excluded_components: vec!["Spinner".to_string()],
        ..TelemetryConfig::default()
    });
    let factory = ElementFactory::new();
    ensure_auto_instrumentation(&factory, &h.telemetry);
    h.telemetry.register_manual_instrumentation("HeroTitle");
    h.telemetry.exclude_from_auto_instrumentation("Cursor");

    let passthrough: Vec<Arc<dyn Component>> = vec![
        Arc::new(FnComponent::anonymous(|_, _| Vec::new())),
        Arc::new(FnComponent::new("", |_, _| Vec::new())),
        Arc::new(FnComponent::new("HeroTitle", |_, _| Vec::new())),
        Arc::new(FnComponent::new("Spinner", |_, _| Vec::new())),
        Arc::new(FnComponent::new("Cursor", |_, _| Vec::new())),
        Arc::new(FnComponent::new("Inner", |_, _| Vec::new()).with_display_name("Telemetry(Inner)")),
        instrument_component(&h.telemetry, card(), "Card", None),
    ];

    for component in passthrough {
        let created = component_of(&factory.component(Arc::clone(&component), props! {}));
        assert!(
            same(&created, &component),
            "{:?} should not be wrapped",
            component.display_name().or_else(|| component.function_name())
        );
    }
}

#[test]
fn test_skip_rules() {
    let h = harness(true);
    let instrumentor = AutoInstrumentor::new(&h.telemetry);
    h.telemetry.register_manual_instrumentation("Typewriter");

    assert!(instrumentor.should_skip(""));
    assert!(instrumentor.should_skip("Anonymous"));
    assert!(instrumentor.should_skip("Typewriter"));
    assert!(instrumentor.should_skip("Instrumented(Footer)"));
    assert!(!instrumentor.should_skip("ProjectCard"));
}

#[test]
fn test_auto_wrapped_mount_logs_sanitized_props() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let published = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let element = factory.component(
        card(),
        props! {
            "title" => "Hex Grid",
            "onSelect" => PropValue::Callback(Callback::new(|_| {})),
            "icon" => factory.intrinsic("svg", props! {}),
            "tags" => vec![PropValue::from("webgl"), PropValue::from("rust")],
            "published" => published,
            "meta" => PropValue::Object(BTreeMap::new()),
            "children" => vec![
                PropValue::from(factory.intrinsic("span", props! {})),
                PropValue::from(factory.intrinsic("span", props! {})),
            ],
        },
    );
    let node = renderer.mount(element);
    assert_eq!(node.name(), "Telemetry(Card)");

    let records = h.recorder.events_for("Card");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event, "mount");
    assert_eq!(
        records[0].detail,
        Some(json!({
            "props": {
                "title": "Hex Grid",
                "onSelect": "function",
                "icon": "ReactElement(svg)",
                "tags": "Array(2)",
                "published": "2024-03-01T09:00:00.000Z",
                "meta": "Object",
                "children": "children(2)",
            }
        }))
    );
    assert_eq!(records[1].event, "render");

    renderer.unmount(node);
    let unmounts = h.recorder.events_named("unmount");
    assert_eq!(unmounts.len(), 1);
    assert_eq!(unmounts[0].component, "Card");
    assert!(
        !h.telemetry.is_component_manually_instrumented("Card"),
        "Auto wrappers do not count as manual instrumentation"
    );
}

#[test]
fn test_nested_tree_commit_and_unmount_order() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let inner = card();
    let page: Arc<dyn Component> = Arc::new(FnComponent::new("Page", move |_, factory| {
        vec![factory.component(Arc::clone(&inner), props! { "title" => "one" })]
    }));

    let node = renderer.mount(factory.component(page, props! {}));
    assert!(node.find("Telemetry(Card)").is_some());

    let mounts: Vec<String> = h
        .recorder
        .events_named("mount")
        .into_iter()
        .map(|r| r.component)
        .collect();
    assert_eq!(mounts, vec!["Card", "Page"], "Children commit before parents");

    renderer.unmount(node);
    let unmounts: Vec<String> = h
        .recorder
        .events_named("unmount")
        .into_iter()
        .map(|r| r.component)
        .collect();
    assert_eq!(unmounts, vec!["Page", "Card"], "Parents unmount first");
}

#[test]
fn test_rerender_keeps_instance() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let mut node = renderer.mount(factory.component(card(), props! { "title" => "a" }));
    h.clock.advance(2500.0);
    renderer.update(&mut node, props! { "title" => "b" });

    assert_eq!(h.recorder.events_named("mount").len(), 1);
    let renders = h.recorder.events_named("render");
    assert_eq!(renders.len(), 2);
    assert_eq!(detail_f64(&renders[1], "renderCount"), 2.0);
    assert_eq!(
        renders[1].detail.as_ref().and_then(|d| d.pointer("/props/title")),
        Some(&json!("b"))
    );
}

#[test]
fn test_auto_wrapper_uses_configured_throttle() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let mut node = renderer.mount(factory.component(card(), props! {}));
    h.clock.advance(1500.0);
    renderer.refresh(&mut node);

    assert_eq!(
        h.recorder.events_named("render").len(),
        1,
        "Auto-instrumented renders throttle at 2000ms"
    );
}

#[test]
fn test_explicit_wrapper_logs_under_given_name() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    let footer = instrument_component(
        &h.telemetry,
        Arc::new(FnComponent::new("FooterContent", |_, factory| {
            vec![factory.intrinsic("footer", props! {})]
        })),
        "Footer",
        None,
    );
    assert_eq!(footer.display_name(), Some("Instrumented(FooterContent)"));

    let node = renderer.mount(factory.component(footer, props! { "year" => 2024 }));
    assert_eq!(node.name(), "Instrumented(FooterContent)");

    let mounts = h.recorder.events_named("mount");
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].component, "Footer");
    assert_eq!(mounts[0].detail, Some(json!({ "props": { "year": 2024.0 } })));
    assert!(h.telemetry.is_component_manually_instrumented("Footer"));
}

#[test]
fn test_children_summaries() {
    let factory = ElementFactory::new();

    let none = sanitize_props(&props! { "children" => PropValue::Null });
    assert_eq!(none.get("children"), Some(&json!(null)));

    let single = sanitize_props(&props! { "children" => factory.intrinsic("p", props! {}) });
    assert_eq!(single.get("children"), Some(&json!("child")));

    let text = sanitize_props(&props! { "children" => "hello" });
    assert_eq!(text.get("children"), Some(&json!("child")));
}

/// Component that reports its own lifecycle, without registering up front.
struct SelfReporting {
    telemetry: Telemetry,
    instances: Arc<AtomicUsize>,
}

impl Component for SelfReporting {
    fn function_name(&self) -> Option<&str> {
        Some("Typewriter")
    }

    fn instantiate(self: Arc<Self>) -> Box<dyn ComponentInstance> {
        self.instances.fetch_add(1, Ordering::SeqCst);
        Box::new(SelfReportingInstance {
            instrumentation: ComponentInstrumentation::new(&self.telemetry, "Typewriter"),
        })
    }
}

struct SelfReportingInstance {
    instrumentation: ComponentInstrumentation,
}

impl ComponentInstance for SelfReportingInstance {
    fn render(&mut self, _props: &Props, factory: &ElementFactory) -> Vec<Element> {
        self.instrumentation
            .begin_render(ComponentOptions::new().throttle_ms(0.0));
        vec![factory.intrinsic("h1", props! {})]
    }

    fn committed(&mut self) {
        self.instrumentation.commit();
    }

    fn unmounting(&mut self) {
        self.instrumentation.unmount();
    }
}

#[test]
fn test_self_instrumented_child_survives_parent_rerender() {
    let h = harness(true);
    let factory = Arc::new(ElementFactory::new());
    ensure_auto_instrumentation(&factory, &h.telemetry);
    let renderer = Renderer::new(Arc::clone(&factory));

    // 1. A self-reporting child under an auto-wrapped parent, nothing pre-registered.
    let instances = Arc::new(AtomicUsize::new(0));
    let child: Arc<dyn Component> = Arc::new(SelfReporting {
        telemetry: h.telemetry.clone(),
        instances: Arc::clone(&instances),
    });
    let parent: Arc<dyn Component> = Arc::new(FnComponent::new("Hero", move |_, factory| {
        vec![factory.component(Arc::clone(&child), props! {})]
    }));
    let mut root = renderer.mount(factory.component(parent, props! {}));
    assert!(h.telemetry.is_component_manually_instrumented("Typewriter"));
    let child_name = root.children()[0].name();

    // 2. Parent re-renders twice.
    renderer.refresh(&mut root);
    renderer.refresh(&mut root);

    assert_eq!(root.children()[0].name(), child_name, "Child element type must stay stable");
    assert_eq!(instances.load(Ordering::SeqCst), 1, "Child instance must survive re-renders");

    let events: Vec<String> = h
        .recorder
        .events_for("Typewriter")
        .into_iter()
        .map(|r| r.event)
        .collect();
    assert_eq!(
        events,
        vec!["mount", "render", "render", "render"],
        "One instrumentation per instance, no remount"
    );

    // 3. Unmount is reported once.
    renderer.unmount(root);
    let unmounts = h
        .recorder
        .events_named("unmount")
        .into_iter()
        .filter(|r| r.component == "Typewriter")
        .count();
    assert_eq!(unmounts, 1);
}
