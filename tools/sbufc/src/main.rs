use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sbuf_codegen::{GeneratedFile, GoOptions, generate_doc, generate_go, generate_ts};
use sbuf_core::Schema;

#[derive(Parser)]
#[command(
    name = "sbufc",
    about = "Compile an sbuf schema into Go and TypeScript bindings"
)]
struct Cli {
    /// Schema source file
    schema: PathBuf,

    /// Output directory for the Go package
    #[arg(long, value_name = "DIR", default_value = "./go")]
    go: PathBuf,

    /// Output directory for the TypeScript package
    #[arg(long, value_name = "DIR", default_value = "./ts")]
    ts: PathBuf,

    /// Comma-separated Go struct tag keys (e.g. bson,json)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    tag: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let written = run(&cli)?;
    println!("Successfully generated {written} files.");
    Ok(())
}

fn run(cli: &Cli) -> Result<usize> {
    let source = fs::read_to_string(&cli.schema)
        .with_context(|| format!("read {}", cli.schema.display()))?;
    let schema = sbuf_schema::compile(&source)
        .with_context(|| format!("compile {}", cli.schema.display()))?;

    let mut written = 0;
    written += write_target(&cli.go, &go_files(&schema, &cli.tag)?)?;
    written += write_target(&cli.ts, &ts_files(&schema)?)?;
    Ok(written)
}

fn go_files(schema: &Schema, tags: &[String]) -> Result<Vec<GeneratedFile>> {
    let opts = GoOptions {
        package: "sb".to_string(),
        tags: tags.to_vec(),
    };
    let mut files = generate_go(schema, &opts)?;
    files.push(generate_doc(schema));
    Ok(files)
}

fn ts_files(schema: &Schema) -> Result<Vec<GeneratedFile>> {
    let mut files = generate_ts(schema)?;
    files.push(generate_doc(schema));
    Ok(files)
}

/// Write a package into `<dir>/sb/`, skipping overwrite-protected files that
/// already exist (hand-edited logic stubs).
fn write_target(dir: &Path, files: &[GeneratedFile]) -> Result<usize> {
    let package_dir = dir.join("sb");
    fs::create_dir_all(&package_dir)
        .with_context(|| format!("create {}", package_dir.display()))?;

    let mut written = 0;
    for file in files {
        let path = package_dir.join(&file.path);
        if file.skip_if_exists && path.exists() {
            continue;
        }
        fs::write(&path, &file.content).with_context(|| format!("write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(schema_path: &Path, root: &Path) -> Cli {
        Cli {
            schema: schema_path.to_path_buf(),
            go: root.join("go"),
            ts: root.join("ts"),
            tag: vec!["json".to_string()],
        }
    }

    #[test]
    fn generates_both_targets_with_docs() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("api.sb");
        fs::write(
            &schema_path,
            "User { id u32, name text }\nuser.get(id u32) => User",
        )
        .unwrap();

        let written = run(&cli(&schema_path, dir.path())).unwrap();
        assert!(written > 0);

        let go_struct = dir.path().join("go/sb/struct_user.go");
        let ts_struct = dir.path().join("ts/sb/struct_user.ts");
        assert!(go_struct.exists());
        assert!(ts_struct.exists());
        assert!(dir.path().join("go/sb/DOC.md").exists());
        assert!(dir.path().join("ts/sb/DOC.md").exists());

        let content = fs::read_to_string(go_struct).unwrap();
        assert!(content.contains("`json:\"id\"`"));
    }

    #[test]
    fn logic_stubs_survive_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("api.sb");
        fs::write(&schema_path, "ping() => nil").unwrap();

        let cli = cli(&schema_path, dir.path());
        run(&cli).unwrap();

        let stub = dir.path().join("go/sb/api.ping.go");
        fs::write(&stub, "// hand-written logic\n").unwrap();
        run(&cli).unwrap();
        assert_eq!(
            fs::read_to_string(&stub).unwrap(),
            "// hand-written logic\n"
        );
    }

    #[test]
    fn pipeline_errors_surface_one_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("bad.sb");
        fs::write(&schema_path, "User { info Missing }").unwrap();

        let err = run(&cli(&schema_path, dir.path())).unwrap_err();
        assert!(format!("{err:#}").contains("undefined type 'Missing'"));
    }
}
