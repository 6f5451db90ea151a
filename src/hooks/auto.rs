use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::host::{
    component_name, sanitize_props, Component, ComponentInstance, Element, ElementFactory,
    ElementInterceptor, Props, ANONYMOUS,
};
use crate::telemetry::Telemetry;

use super::lifecycle::{ComponentInstrumentation, ComponentOptions};

const AUTO_PREFIX: &str = "Telemetry(";
const MANUAL_PREFIX: &str = "Instrumented(";

/// Builds the options of one render from that render's props.
pub type OptionsFactory = Arc<dyn Fn(&Props) -> ComponentOptions + Send + Sync>;

/// Component that runs lifecycle telemetry around another component.
pub struct Instrumented {
    inner: Arc<dyn Component>,
    telemetry: Telemetry,
    component_name: String,
    display_name: String,
    options: OptionsFactory,
    registers_manual: bool,
}

impl Instrumented {
    fn automatic(telemetry: &Telemetry, inner: Arc<dyn Component>, name: String) -> Self {
        let throttle_ms = telemetry.config().auto_throttle_ms;
        Self {
            inner,
            telemetry: telemetry.clone(),
            display_name: format!("{AUTO_PREFIX}{name})"),
            component_name: name,
            options: Arc::new(move |props: &Props| {
                sanitized_props_options(props).throttle_ms(throttle_ms)
            }),
            registers_manual: false,
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }
}

fn sanitized_props_options(props: &Props) -> ComponentOptions {
    let props = props.clone();
    ComponentOptions::new().props(move || Ok(sanitize_props(&props)))
}

impl Component for Instrumented {
    fn display_name(&self) -> Option<&str> {
        Some(&self.display_name)
    }

    fn is_telemetry_wrapper(&self) -> bool {
        true
    }

    fn instantiate(self: Arc<Self>) -> Box<dyn ComponentInstance> {
        let instrumentation = if self.registers_manual {
            ComponentInstrumentation::new(&self.telemetry, &self.component_name)
        } else {
            ComponentInstrumentation::external(&self.telemetry, &self.component_name)
        };
        Box::new(InstrumentedInstance {
            inner: Arc::clone(&self.inner).instantiate(),
            wrapper: self,
            instrumentation,
            yielded: false,
        })
    }
}

struct InstrumentedInstance {
    wrapper: Arc<Instrumented>,
    inner: Box<dyn ComponentInstance>,
    instrumentation: ComponentInstrumentation,
    // set once an auto-wrapped component turns out to instrument itself
    yielded: bool,
}

impl ComponentInstance for InstrumentedInstance {
    fn render(&mut self, props: &Props, factory: &ElementFactory) -> Vec<Element> {
        if !self.yielded {
            self.instrumentation.begin_render((self.wrapper.options)(props));
        }
        let rendered = self.inner.render(props, factory);

        if !self.wrapper.registers_manual
            && self
                .wrapper
                .telemetry
                .is_component_manually_instrumented(&self.wrapper.component_name)
        {
            self.yielded = true;
        }
        rendered
    }

    fn committed(&mut self) {
        self.inner.committed();
        if !self.yielded {
            self.instrumentation.commit();
        }
    }

    fn unmounting(&mut self) {
        if !self.yielded {
            self.instrumentation.unmount();
        }
        self.inner.unmounting();
    }
}

/// Wraps `component` so every instance reports under `name`.
///
/// Without an options factory each render snapshots its sanitized props.
pub fn instrument_component(
    telemetry: &Telemetry,
    component: Arc<dyn Component>,
    name: &str,
    options: Option<OptionsFactory>,
) -> Arc<dyn Component> {
    let inner_name = component
        .display_name()
        .or_else(|| component.function_name())
        .unwrap_or("Component")
        .to_string();

    Arc::new(Instrumented {
        inner: component,
        telemetry: telemetry.clone(),
        component_name: name.to_string(),
        display_name: format!("{MANUAL_PREFIX}{inner_name})"),
        options: options.unwrap_or_else(|| Arc::new(sanitized_props_options)),
        registers_manual: true,
    })
}

/// Element interceptor that wraps uninstrumented components.
pub struct AutoInstrumentor {
    telemetry: Telemetry,
    // keyed by the address of the original component; the original is kept
    // alive alongside its wrapper so the address cannot be reused
    wrappers: Mutex<HashMap<usize, (Arc<dyn Component>, Arc<dyn Component>)>>,
}

impl AutoInstrumentor {
    pub fn new(telemetry: &Telemetry) -> Self {
        Self {
            telemetry: telemetry.clone(),
            wrappers: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_skip(&self, name: &str) -> bool {
        name.is_empty()
            || name == ANONYMOUS
            || self.telemetry.is_excluded_from_auto_instrumentation(name)
            || self.telemetry.is_component_manually_instrumented(name)
            || name.starts_with(AUTO_PREFIX)
            || name.starts_with(MANUAL_PREFIX)
    }

    pub fn wrapped_count(&self) -> usize {
        self.wrappers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ElementInterceptor for AutoInstrumentor {
    fn intercept(&self, component: Arc<dyn Component>) -> Arc<dyn Component> {
        if component.is_telemetry_wrapper() {
            return component;
        }

        // A type wrapped once stays wrapped, even if it registers itself as
        // manual later; handing back the original would remount it.
        let key = Arc::as_ptr(&component) as *const () as usize;
        let mut wrappers = self.wrappers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, wrapped)) = wrappers.get(&key) {
            return Arc::clone(wrapped);
        }

        let name = component_name(component.as_ref());
        if self.should_skip(&name) {
            return component;
        }

        debug!(component = %name, "auto-instrumenting component");
        let wrapped: Arc<dyn Component> =
            Arc::new(Instrumented::automatic(&self.telemetry, Arc::clone(&component), name));
        wrappers.insert(key, (component, Arc::clone(&wrapped)));
        wrapped
    }
}

/// Installs auto-instrumentation on `factory`.
///
/// Only the first call on a factory has any effect; it returns `true`.
pub fn ensure_auto_instrumentation(factory: &ElementFactory, telemetry: &Telemetry) -> bool {
    if factory.is_intercepted() {
        return false;
    }
    factory.install_interceptor(Arc::new(AutoInstrumentor::new(telemetry)))
}
