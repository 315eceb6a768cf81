/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::any::{type_name, TypeId};

use dashmap::DashMap;

const PRIMITIVES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize", "f32",
    "f64", "bool", "char",
];

/// Portable names for Rust types.
///
/// `std::any::type_name` output differs between compiler versions and crate layouts, so names
/// that cross the wire are decorated: standard types get short `@` names
/// (`i32` → `@i32`, `Vec<i32>` → `@vec<@i32>`, `String` → `@str`) and user types keep their
/// path with decorated generic arguments. Results are cached per type.
#[derive(Debug, Default)]
pub struct DecoratedNamesMap {
    names: DashMap<TypeId, String>,
}

impl DecoratedNamesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decorated name of `T`.
    pub fn of<T: 'static + ?Sized>(&self) -> String {
        self.names
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Self::decorate(type_name::<T>()))
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Decorates a raw `type_name` string.
    pub fn decorate(raw: &str) -> String {
        let name = raw.trim();
        if name == "()" {
            return "@unit".to_string();
        }
        if let Some(inner) = name.strip_prefix('&') {
            let inner = inner.trim_start();
            return Self::decorate(inner.strip_prefix("mut ").unwrap_or(inner));
        }
        if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
            let items: Vec<String> = split_top_level(inner, ',')
                .into_iter()
                .filter(|item| !item.trim().is_empty())
                .map(Self::decorate)
                .collect();
            return format!("@tuple<{}>", items.join(","));
        }
        if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
            let element = split_top_level(inner, ';')
                .into_iter()
                .next()
                .unwrap_or(inner);
            return format!("@vec<{}>", Self::decorate(element));
        }

        let (path, args) = match name.find('<') {
            Some(open) if name.ends_with('>') => (&name[..open], Some(&name[open + 1..name.len() - 1])),
            _ => (name, None),
        };
        let args: Vec<String> = args
            .map(|args| split_top_level(args, ',').into_iter().map(Self::decorate).collect())
            .unwrap_or_default();
        let ident = path.rsplit("::").next().unwrap_or(path);

        if is_standard(path) {
            let short = match ident {
                p if PRIMITIVES.contains(&p) => Some(format!("@{p}")),
                "String" | "str" => Some("@str".to_string()),
                "Vec" | "VecDeque" => Some("@vec".to_string()),
                "HashMap" | "BTreeMap" => Some("@map".to_string()),
                "HashSet" | "BTreeSet" => Some("@set".to_string()),
                "Option" => Some("@opt".to_string()),
                "Box" | "Arc" | "Rc" if args.len() == 1 => return args.join(""),
                _ => None,
            };
            if let Some(short) = short {
                return with_args(short, &args);
            }
        }
        if path == "rivet_core::message::empty::EmptyMessage" {
            return "@empty".to_string();
        }
        with_args(path.to_string(), &args)
    }
}

fn is_standard(path: &str) -> bool {
    !path.contains("::")
        || path.starts_with("std::")
        || path.starts_with("core::")
        || path.starts_with("alloc::")
}

fn with_args(base: String, args: &[String]) -> String {
    if args.is_empty() {
        base
    } else {
        format!("{base}<{}>", args.join(","))
    }
}

/// Splits on `separator` outside any bracket pair.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}
