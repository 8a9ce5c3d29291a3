//! Test fixtures for common test scenarios.
//!
//! Source trees and recipes modelled on a small header-only graph library.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::Recipe;

/// Recipe text for the header-only fixture, sourcing `../celaeno`.
pub const HEADER_ONLY_RECIPE: &str = r#"
[package]
name = "celaeno"
version = "0.1"
license = "MIT"
sensitivity = "header-only"

[source]
path = "../celaeno"

[[source.patch]]
file = "CMakeLists.txt"
search = "add_subdirectory(test)"

[build]
system = "none"

[[install]]
pattern = "*.hpp"
src = "include"
dst = "include"

[[install]]
pattern = "LICENSE"
dst = "licenses"
"#;

/// Write (or overwrite) a header-only source tree at `dir`.
///
/// `bfs` is the content of `include/celaeno/bfs.hpp`.
pub fn write_source_tree(dir: &Path, bfs: &str) {
    fs::create_dir_all(dir.join("include/celaeno")).unwrap();
    fs::create_dir_all(dir.join("test")).unwrap();
    fs::write(dir.join("include/celaeno/bfs.hpp"), bfs).unwrap();
    fs::write(dir.join("include/celaeno/dfs.hpp"), "#pragma once\n").unwrap();
    fs::write(dir.join("test/bfs_test.cpp"), "int main() {}\n").unwrap();
    fs::write(dir.join("LICENSE"), "MIT License\n").unwrap();
    fs::write(
        dir.join("CMakeLists.txt"),
        "cmake_minimum_required(VERSION 3.10)\nproject(celaeno)\nadd_subdirectory(test)\n",
    )
    .unwrap();
}

/// Lay out `<root>/celaeno` and `<root>/recipe/Recipe.toml`, returning the
/// recipe path.
pub fn write_header_only_fixture(root: &Path) -> PathBuf {
    write_source_tree(&root.join("celaeno"), "#pragma once\n");

    let recipe_dir = root.join("recipe");
    fs::create_dir_all(&recipe_dir).unwrap();
    let path = recipe_dir.join("Recipe.toml");
    fs::write(&path, HEADER_ONLY_RECIPE).unwrap();
    path
}

/// The header-only fixture, loaded.
pub fn header_only_recipe(root: &Path) -> Recipe {
    Recipe::load(&write_header_only_fixture(root)).unwrap()
}
