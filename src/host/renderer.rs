use std::sync::Arc;

use super::{component_name, ComponentInstance, Element, ElementFactory, ElementType, Props};

/// A mounted element and its mounted subtree.
pub struct MountedNode {
    ty: ElementType,
    props: Props,
    instance: Option<Box<dyn ComponentInstance>>,
    children: Vec<MountedNode>,
}

impl MountedNode {
    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[MountedNode] {
        &self.children
    }

    /// Tag for intrinsics, resolved component name otherwise.
    pub fn name(&self) -> String {
        match &self.ty {
            ElementType::Intrinsic(tag) => tag.clone(),
            ElementType::Component(component) => component_name(component.as_ref()),
        }
    }

    /// Depth-first search by [`MountedNode::name`].
    pub fn find(&self, name: &str) -> Option<&MountedNode> {
        if self.name() == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}

impl std::fmt::Debug for MountedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedNode")
            .field("name", &self.name())
            .field("children", &self.children)
            .finish()
    }
}

/// Mounts element trees and keeps them in sync with new props.
///
/// Children are matched by position. A child whose type changed is unmounted
/// and a fresh one mounted in its place. Commit callbacks run children first;
/// unmount callbacks run parents first.
#[derive(Debug, Clone)]
pub struct Renderer {
    factory: Arc<ElementFactory>,
}

impl Renderer {
    pub fn new(factory: Arc<ElementFactory>) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    pub fn mount(&self, element: Element) -> MountedNode {
        let Element { ty, props } = element;

        let (instance, rendered) = match &ty {
            ElementType::Component(component) => {
                let mut instance = Arc::clone(component).instantiate();
                let rendered = instance.render(&props, &self.factory);
                (Some(instance), rendered)
            }
            ElementType::Intrinsic(_) => (None, Element::child_elements(&props)),
        };

        let mut node = MountedNode {
            ty,
            props,
            instance,
            children: Vec::new(),
        };
        node.children = rendered.into_iter().map(|child| self.mount(child)).collect();

        if let Some(instance) = node.instance.as_mut() {
            instance.committed();
        }
        node
    }

    pub fn update(&self, node: &mut MountedNode, props: Props) {
        node.props = props;

        let rendered = match node.instance.as_mut() {
            Some(instance) => instance.render(&node.props, &self.factory),
            None => Element::child_elements(&node.props),
        };
        self.reconcile(node, rendered);

        if let Some(instance) = node.instance.as_mut() {
            instance.committed();
        }
    }

    /// Re-renders with the props the node already has.
    pub fn refresh(&self, node: &mut MountedNode) {
        let props = node.props.clone();
        self.update(node, props);
    }

    pub fn unmount(&self, mut node: MountedNode) {
        if let Some(instance) = node.instance.as_mut() {
            instance.unmounting();
        }
        for child in node.children.drain(..) {
            self.unmount(child);
        }
    }

    fn reconcile(&self, node: &mut MountedNode, rendered: Vec<Element>) {
        let mut previous = std::mem::take(&mut node.children).into_iter();
        let mut next = Vec::with_capacity(rendered.len());

        for element in rendered {
            match previous.next() {
                Some(mut existing) if existing.ty.same_type(&element.ty) => {
                    self.update(&mut existing, element.props);
                    next.push(existing);
                }
                Some(existing) => {
                    self.unmount(existing);
                    next.push(self.mount(element));
                }
                None => next.push(self.mount(element)),
            }
        }

        for leftover in previous {
            self.unmount(leftover);
        }
        node.children = next;
    }
}
