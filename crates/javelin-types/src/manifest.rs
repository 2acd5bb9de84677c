//! Declarative type universes
//!
//! A manifest describes a type universe in TOML:
//!
//! ```toml
//! java_lang = true
//! arrays = ["Shape", "int[]"]
//!
//! [[interface]]
//! name = "Shape"
//!
//! [[class]]
//! name = "Circle"
//! implements = ["Shape"]
//!
//! [[class]]
//! name = "Unit"
//! extends = "Circle"
//! ```
//!
//! Each `arrays` entry names an element type; the array of it is declared.

use crate::builder::TypeGraphBuilder;
use crate::error::{TypeGraphError, TypeGraphResult};
use crate::graph::TypeGraph;
use serde::Deserialize;
use std::path::Path;

/// Class entry of a manifest
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClassDecl {
    /// Fully qualified name
    pub name: String,
    /// Superclass name; `java.lang.Object` when absent
    #[serde(default)]
    pub extends: Option<String>,
    /// Implemented interfaces
    #[serde(default)]
    pub implements: Vec<String>,
    /// Declared abstract
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

/// Interface entry of a manifest
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InterfaceDecl {
    /// Fully qualified name
    pub name: String,
    /// Extended interfaces
    #[serde(default)]
    pub extends: Vec<String>,
}

/// Parsed type universe description
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TypeGraphManifest {
    /// Pre-register the well-known `java.lang` hierarchy
    #[serde(default)]
    pub java_lang: bool,
    /// Class declarations
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDecl>,
    /// Interface declarations
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<InterfaceDecl>,
    /// Element types whose arrays are declared
    #[serde(default)]
    pub arrays: Vec<String>,
}

impl TypeGraphManifest {
    /// Parse a manifest from TOML text
    pub fn from_toml_str(source: &str) -> TypeGraphResult<Self> {
        toml::from_str(source).map_err(|e| TypeGraphError::Manifest {
            message: e.to_string(),
        })
    }

    /// Read and parse a manifest file
    pub fn load(path: impl AsRef<Path>) -> TypeGraphResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| TypeGraphError::Manifest {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }

    /// Builder populated with this manifest's declarations
    pub fn to_builder(&self) -> TypeGraphBuilder {
        let mut builder = TypeGraphBuilder::new();
        for iface in &self.interfaces {
            let extends: Vec<&str> = iface.extends.iter().map(String::as_str).collect();
            builder.interface(&iface.name, &extends);
        }
        for class in &self.classes {
            let implements: Vec<&str> = class.implements.iter().map(String::as_str).collect();
            if class.is_abstract {
                builder.abstract_class(&class.name, class.extends.as_deref(), &implements);
            } else {
                builder.class(&class.name, class.extends.as_deref(), &implements);
            }
        }
        if self.java_lang {
            builder.with_java_lang();
        }
        for element in &self.arrays {
            builder.array(element);
        }
        builder
    }

    /// Build the described graph
    pub fn build(&self) -> TypeGraphResult<TypeGraph> {
        self.to_builder().build()
    }
}
