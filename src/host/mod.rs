//! Minimal component host the instrumentation plugs into.
//!
//! Components build child elements through an [`ElementFactory`], and a
//! [`Renderer`] mounts, re-renders and unmounts element trees, calling the
//! post-commit and unmount callbacks of each component instance.

pub mod redact;
pub mod renderer;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};

pub use redact::{redact, sanitize_props};
pub use renderer::{MountedNode, Renderer};

pub const ANONYMOUS: &str = "Anonymous";
pub const CHILDREN: &str = "children";

pub type Props = BTreeMap<String, PropValue>;

#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&[PropValue]) + Send + Sync>);

impl Callback {
    pub fn new(f: impl Fn(&[PropValue]) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[PropValue]) {
        (self.0)(args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

#[derive(Debug, Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Callback(Callback),
    Element(Box<Element>),
    List(Vec<PropValue>),
    Date(DateTime<Utc>),
    Object(BTreeMap<String, PropValue>),
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for PropValue {
                fn from(value: $ty) -> Self {
                    PropValue::Number(value as f64)
                }
            }
        )+
    };
}

number_from!(i32, i64, u32, u64, usize);

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<Element> for PropValue {
    fn from(value: Element) -> Self {
        PropValue::Element(Box::new(value))
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(value: Vec<PropValue>) -> Self {
        PropValue::List(value)
    }
}

impl From<DateTime<Utc>> for PropValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropValue::Date(value)
    }
}

/// Builds a [`Props`] map from `key => value` pairs.
#[macro_export]
macro_rules! props {
    () => { $crate::host::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::host::Props::new();
        $( props.insert(($key).to_string(), $crate::host::PropValue::from($value)); )+
        props
    }};
}

#[derive(Clone)]
pub enum ElementType {
    Intrinsic(String),
    Component(Arc<dyn Component>),
}

impl ElementType {
    /// Tag equality for intrinsics, allocation identity for components.
    pub fn same_type(&self, other: &ElementType) -> bool {
        match (self, other) {
            (ElementType::Intrinsic(a), ElementType::Intrinsic(b)) => a == b,
            (ElementType::Component(a), ElementType::Component(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ElementType::Intrinsic(tag) => tag.clone(),
            ElementType::Component(component) => component
                .display_name()
                .or_else(|| component.function_name())
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Intrinsic(tag) => f.debug_tuple("Intrinsic").field(tag).finish(),
            ElementType::Component(_) => f.debug_tuple("Component").field(&self.describe()).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub ty: ElementType,
    pub props: Props,
}

impl Element {
    /// Elements carried by the `children` prop.
    pub fn child_elements(props: &Props) -> Vec<Element> {
        match props.get(CHILDREN) {
            Some(PropValue::Element(element)) => vec![element.as_ref().clone()],
            Some(PropValue::List(items)) => items
                .iter()
                .filter_map(|item| match item {
                    PropValue::Element(element) => Some(element.as_ref().clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A component definition.
pub trait Component: Send + Sync + 'static {
    fn display_name(&self) -> Option<&str> {
        None
    }

    fn function_name(&self) -> Option<&str> {
        None
    }

    /// Set on wrappers produced by the instrumentation layer.
    fn is_telemetry_wrapper(&self) -> bool {
        false
    }

    fn instantiate(self: Arc<Self>) -> Box<dyn ComponentInstance>;
}

/// One mounted occurrence of a component.
pub trait ComponentInstance {
    fn render(&mut self, props: &Props, factory: &ElementFactory) -> Vec<Element>;

    /// Runs after this instance and its children committed.
    fn committed(&mut self) {}

    /// Runs once, before the instance and its children are removed.
    fn unmounting(&mut self) {}
}

/// Display name, then function name, then [`ANONYMOUS`].
pub fn component_name(component: &dyn Component) -> String {
    component
        .display_name()
        .or_else(|| component.function_name())
        .filter(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

type RenderFn = dyn Fn(&Props, &ElementFactory) -> Vec<Element> + Send + Sync;

/// Stateless component backed by a closure.
pub struct FnComponent {
    function_name: Option<String>,
    display_name: Option<String>,
    render: Box<RenderFn>,
}

impl FnComponent {
    pub fn new(
        name: &str,
        render: impl Fn(&Props, &ElementFactory) -> Vec<Element> + Send + Sync + 'static,
    ) -> Self {
        Self {
            function_name: Some(name.to_string()),
            display_name: None,
            render: Box::new(render),
        }
    }

    pub fn anonymous(
        render: impl Fn(&Props, &ElementFactory) -> Vec<Element> + Send + Sync + 'static,
    ) -> Self {
        Self {
            function_name: None,
            display_name: None,
            render: Box::new(render),
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }
}

impl Component for FnComponent {
    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    fn instantiate(self: Arc<Self>) -> Box<dyn ComponentInstance> {
        Box::new(FnInstance { component: self })
    }
}

struct FnInstance {
    component: Arc<FnComponent>,
}

impl ComponentInstance for FnInstance {
    fn render(&mut self, props: &Props, factory: &ElementFactory) -> Vec<Element> {
        (self.component.render)(props, factory)
    }
}

/// Hook into element creation; may substitute the component type.
pub trait ElementInterceptor: Send + Sync {
    fn intercept(&self, component: Arc<dyn Component>) -> Arc<dyn Component>;
}

/// The element-creation primitive.
///
/// At most one interceptor can ever be installed.
#[derive(Default)]
pub struct ElementFactory {
    interceptor: OnceLock<Arc<dyn ElementInterceptor>>,
}

impl ElementFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an interceptor was already in place.
    pub fn install_interceptor(&self, interceptor: Arc<dyn ElementInterceptor>) -> bool {
        self.interceptor.set(interceptor).is_ok()
    }

    pub fn is_intercepted(&self) -> bool {
        self.interceptor.get().is_some()
    }

    pub fn create_element(&self, ty: ElementType, props: Props) -> Element {
        let ty = match (ty, self.interceptor.get()) {
            (ElementType::Component(component), Some(interceptor)) => {
                ElementType::Component(interceptor.intercept(component))
            }
            (ty, _) => ty,
        };
        Element { ty, props }
    }

    pub fn intrinsic(&self, tag: &str, props: Props) -> Element {
        self.create_element(ElementType::Intrinsic(tag.to_string()), props)
    }

    pub fn component(&self, component: Arc<dyn Component>, props: Props) -> Element {
        self.create_element(ElementType::Component(component), props)
    }
}

impl fmt::Debug for ElementFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementFactory")
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}
