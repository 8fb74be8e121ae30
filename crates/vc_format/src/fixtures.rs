//! Entity types shared by the format tests.
//!
//! Each one describes itself for any native value type its fields support.

use alloc::string::String;
use alloc::vec::Vec;

use vc_schema::define::{Describe, Descriptor};
use vc_schema::error::BuildError;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl<N: 'static> Describe<N> for Point
where
    i32: Describe<N>,
{
    fn describe(mut point: Descriptor<'_, Self, N>) -> Result<(), BuildError> {
        point.declare_field("x", |p| &p.x, |p| &mut p.x)?.describe()?;
        point.declare_field("y", |p| &p.y, |p| &mut p.y)?.describe()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub value: i32,
    pub children: Vec<Node>,
}

impl Node {
    pub fn leaf(value: i32) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }
}

impl<N: 'static> Describe<N> for Node
where
    i32: Describe<N>,
{
    fn describe(mut node: Descriptor<'_, Self, N>) -> Result<(), BuildError> {
        node.declare_field("value", |n| &n.value, |n| &mut n.value)?
            .describe()?;
        node.declare_field("children", |n| &n.children, |n| &mut n.children)?
            .describe()
    }
}

/// A flat record touching most scalar kinds and two arrays.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Inventory {
    pub name: String,
    pub tags: Vec<String>,
    pub counts: Vec<u32>,
    pub ratio: f64,
    pub active: bool,
}

impl<N: 'static> Describe<N> for Inventory
where
    String: Describe<N>,
    u32: Describe<N>,
    f64: Describe<N>,
    bool: Describe<N>,
{
    fn describe(mut inventory: Descriptor<'_, Self, N>) -> Result<(), BuildError> {
        inventory
            .declare_field("name", |i| &i.name, |i| &mut i.name)?
            .describe()?;
        inventory
            .declare_field("tags", |i| &i.tags, |i| &mut i.tags)?
            .describe()?;
        inventory
            .declare_field("counts", |i| &i.counts, |i| &mut i.counts)?
            .describe()?;
        inventory
            .declare_field("ratio", |i| &i.ratio, |i| &mut i.ratio)?
            .describe()?;
        inventory
            .declare_field("active", |i| &i.active, |i| &mut i.active)?
            .describe()
    }
}
