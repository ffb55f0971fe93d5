use std::{fs::File, path::Path};

use anyhow::Context;
use dextree::file::{
    access_flags_str,
    dump::{prettify, render_tree},
    AccessKind, Component, DexFile, DexFileContainer,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

fn load_dex(path: &Path, opts: &GlobalOptions) -> anyhow::Result<DexFile> {
    let file =
        File::open(path).with_context(|| format!("failed to open: {}", path.display()))?;
    DexFileContainer::new(&file)?
        .location(path.display().to_string())
        .verify(opts.verify)
        .verify_checksum(opts.checksum)
        .open()
        .with_context(|| format!("failed to decode: {}", path.display()))
}

pub fn tree(path: &Path, depth: Option<usize>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let dex = load_dex(path, opts)?;
    if opts.json {
        let json = serde_json::to_string_pretty(&dex.tree(depth))?;
        println!("{json}");
    } else {
        print!("{}", render_tree(&dex, depth));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TableSummary {
    name: &'static str,
    offset: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct Problem {
    kind: String,
    offset: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    location: String,
    version: u32,
    file_size: usize,
    checksum: String,
    tables: Vec<TableSummary>,
    problems: Vec<Problem>,
}

pub fn summary(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let dex = load_dex(path, opts)?;
    let header = dex.header();

    let sections: [&dyn Component; 10] = [
        dex.string_ids(),
        dex.type_ids(),
        dex.proto_ids(),
        dex.field_ids(),
        dex.method_ids(),
        dex.class_defs(),
        dex.map_list(),
        dex.string_data(),
        dex.class_data(),
        dex.type_lists(),
    ];
    let tables = sections
        .iter()
        .map(|section| TableSummary {
            name: section.name(),
            offset: format!("{:#x}", section.span().offset),
            count: section.children().len(),
        })
        .collect();

    let failures = dex.failures().into_iter().map(|(stage, failure)| Problem {
        kind: stage.to_string(),
        offset: format!("{:#x}", failure.offset),
        error: failure.error.to_string(),
    });
    let issues = dex.issues().iter().map(|issue| Problem {
        kind: issue.component.to_string(),
        offset: format!("{:#x}", issue.offset),
        error: issue.error.to_string(),
    });

    let summary = Summary {
        location: dex.location().to_string(),
        version: header.get_version(),
        file_size: dex.file_size(),
        checksum: format!("{:#010x}", header.checksum),
        tables,
        problems: failures.chain(issues).collect(),
    };

    print_output(&summary, opts, |s| {
        println!("Location:  {}", s.location);
        println!("Version:   {:03}", s.version);
        println!("File size: {}", s.file_size);
        println!("Checksum:  {}", s.checksum);
        println!();

        let mut tw = TabWriter::new(vec![
            ("SECTION", Align::Left),
            ("OFFSET", Align::Right),
            ("COUNT", Align::Right),
        ]);
        for table in &s.tables {
            tw.row(vec![
                table.name.to_string(),
                table.offset.clone(),
                table.count.to_string(),
            ]);
        }
        tw.print();

        if !s.problems.is_empty() {
            println!();
            println!("Problems ({}):", s.problems.len());
            for problem in &s.problems {
                println!("  {} @ {}: {}", problem.kind, problem.offset, problem.error);
            }
        }
    })
}

#[derive(Debug, Serialize)]
struct MapEntry {
    type_: String,
    size: u32,
    offset: String,
}

pub fn map(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let dex = load_dex(path, opts)?;
    let entries: Vec<MapEntry> = dex
        .map_list()
        .iter()
        .map(|item| MapEntry {
            type_: match item.item_type() {
                Some(ty) => ty.as_str().to_string(),
                None => format!("{:#06x}", item.type_),
            },
            size: item.size,
            offset: format!("{:#x}", item.off),
        })
        .collect();

    print_output(&entries, opts, |entries| {
        let mut tw = TabWriter::new(vec![
            ("TYPE", Align::Left),
            ("SIZE", Align::Right),
            ("OFFSET", Align::Right),
        ]);
        for entry in entries {
            tw.row(vec![
                entry.type_.clone(),
                entry.size.to_string(),
                entry.offset.clone(),
            ]);
        }
        tw.print();
    })
}

#[derive(Debug, Serialize)]
struct StringEntry {
    index: usize,
    offset: String,
    value: Option<String>,
}

pub fn strings(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let dex = load_dex(path, opts)?;
    let entries: Vec<StringEntry> = dex
        .string_ids()
        .iter()
        .enumerate()
        .map(|(index, string_id)| StringEntry {
            index,
            offset: format!("{:#x}", string_id.string_data_off),
            value: dex
                .string_data()
                .get(index)
                .map(|item| item.as_str().to_string()),
        })
        .collect();

    print_output(&entries, opts, |entries| {
        let mut tw = TabWriter::new(vec![
            ("INDEX", Align::Right),
            ("OFFSET", Align::Right),
            ("VALUE", Align::Left),
        ]);
        for entry in entries {
            let value = match &entry.value {
                Some(value) => format!("{value:?}"),
                None => "<undecoded>".to_string(),
            };
            tw.row(vec![entry.index.to_string(), entry.offset.clone(), value]);
        }
        tw.print();
    })
}

#[derive(Debug, Serialize)]
struct ClassEntry {
    name: String,
    access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    superclass: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    interfaces: Vec<String>,
    fields: Vec<String>,
    methods: Vec<String>,
}

pub fn classes(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let dex = load_dex(path, opts)?;
    let mut entries = Vec::with_capacity(dex.class_defs().len());

    for class_def in dex.class_defs().iter() {
        let interfaces = match dex.get_interfaces(class_def) {
            Ok(Some(list)) => list
                .iter()
                .map(|item| dex.pretty_type_at(item.type_idx))
                .collect(),
            _ => Vec::new(),
        };

        let (fields, methods) = match dex.get_class_data(class_def) {
            Ok(Some(data)) => (
                data.fields()
                    .map(|field| {
                        let access = access_flags_str(field.access_flags, AccessKind::Field);
                        let name =
                            dex.pretty_field_at(field.field_idx, prettify::Field::WithType);
                        format!("{access} {name}").trim_start().to_string()
                    })
                    .collect(),
                data.methods()
                    .map(|method| {
                        let access = access_flags_str(method.access_flags, AccessKind::Method);
                        let name =
                            dex.pretty_method_at(method.method_idx, prettify::Method::WithSig);
                        format!("{access} {name}").trim_start().to_string()
                    })
                    .collect(),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        entries.push(ClassEntry {
            name: dex.pretty_type_at(class_def.class_idx),
            access: access_flags_str(class_def.access_flags, AccessKind::Class),
            superclass: class_def
                .has_superclass()
                .then(|| dex.pretty_type_at(class_def.superclass_idx)),
            interfaces,
            fields,
            methods,
        });
    }

    print_output(&entries, opts, |entries| {
        for class in entries {
            print!(".class {} {}", class.access, class.name);
            if let Some(superclass) = &class.superclass {
                print!(" extends {superclass}");
            }
            println!();
            for interface in &class.interfaces {
                println!("  .implements {interface}");
            }
            for field in &class.fields {
                println!("  .field {field}");
            }
            for method in &class.methods {
                println!("  .method {method}");
            }
        }
    })
}
