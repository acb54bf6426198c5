use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use clap::Parser;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;

use hpack::dom::{collapse_whitespace_rcdom, parse_html, title};
use hpack::fattr::{AttrStore, MemAttrs, Xattr};
use hpack::{
    read_stream, verify_htpack, write_htpack, HtpackError, HtpackFile, Page, PageTree, ReadPage,
    Verified, WriteOptions,
};

mod cli;
use crate::cli::{Cli, CliError, Commands, Config, DEFAULT_CONFIG};

/// One line of `pack` input.
#[derive(Deserialize, Debug)]
struct InputPage {
    url: String,
    /// Taken from the `<title>` element if absent
    title: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    html: String,
}

fn main() {
    env_logger::init();

    // Parse the cli
    let cli = Cli::parse();

    let res = load_config(cli.config.as_deref()).and_then(|config| {
        debug!("config: {:?}", config);
        run(cli.command, &config)
    });

    if let Err(e) = res {
        eprintln!("htpack: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    match path {
        Some(path) => Ok(toml::from_str(&fs::read_to_string(path)?)?),
        None => Ok(toml::from_str(DEFAULT_CONFIG)?),
    }
}

fn run(command: Commands, config: &Config) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match command {
        Commands::Pack {
            input,
            output,
            no_xattr,
        } => {
            let attrs: Box<dyn AttrStore> = if no_xattr {
                Box::new(MemAttrs::new())
            } else {
                Box::new(Xattr)
            };
            pack(&input, &output, config, attrs.as_ref(), &mut out)?;
        }
        Commands::Dump { file, tree } => {
            for page in read_stream(open_input(file.as_deref())?)? {
                let page = page?;
                let body = if tree {
                    json!({"metadata": page.metadata, "tree": page.document().to_json()?})
                } else {
                    json!({"metadata": page.metadata, "html": page.document().to_html()?})
                };
                write_line(&mut out, &body)?;
            }
        }
        Commands::Text { file } => {
            for page in read_stream(open_input(file.as_deref())?)? {
                let page = page?;
                write_line(
                    &mut out,
                    &json!({
                        "title": page.metadata.title,
                        "url": page.metadata.url,
                        "body": page.document().text(),
                    }),
                )?;
            }
        }
        Commands::Show { file, position } => {
            let mut reader = HtpackFile::open(&file)?;
            let position = position.unwrap_or_else(|| reader.start_position());
            let page = reader
                .read_document(position)?
                .ok_or(CliError::NoPage(position))?;
            write_line(&mut out, &show(&page)?)?;
        }
        Commands::Verify { file } => {
            let readonly = fs::metadata(&file)?.permissions().readonly();
            let verified = verify_htpack(&file, &config.namespace, &Xattr)?;
            write_line(
                &mut out,
                &json!({"file": file, "verified": format!("{:?}", verified), "readonly": readonly}),
            )?;
            out.flush()?;

            match verified {
                Verified::Match if readonly => (),
                Verified::Match => return Err(CliError::Verify("file is writable".to_string())),
                Verified::Mismatch { .. } => {
                    return Err(CliError::Verify("digest mismatch".to_string()))
                }
                Verified::Missing { .. } => {
                    return Err(CliError::Verify("no stored digest".to_string()))
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn pack<W: Write>(
    input: &Path,
    output: &Path,
    config: &Config,
    attrs: &dyn AttrStore,
    out: &mut W,
) -> Result<(), CliError> {
    let lines = BufReader::new(open_input(Some(input))?).lines();
    let collapse = config.collapse_whitespace;

    let source = lines.enumerate().filter_map(|(idx, line)| {
        let line = match line {
            Ok(line) => line,
            Err(e) => return Some(Err(HtpackError::from(e))),
        };
        if line.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<InputPage>(&line) {
            Ok(input) => Some(Ok(to_page(input, collapse))),
            Err(e) => {
                warn!("Skipping input line {}: {}", idx + 1, e);
                None
            }
        }
    });

    let opts = WriteOptions {
        namespace: config.namespace.clone(),
        strict: config.strict,
        additional_attrs: config.attrs.clone(),
    };
    let summary = write_htpack(output, source, &opts, attrs)?;

    write_line(
        out,
        &json!({
            "file": output,
            "digest": summary.digest,
            "pages": summary.pages,
            "skipped": summary.skipped,
            "bytes": summary.bytes,
        }),
    )
}

fn to_page(input: InputPage, collapse: bool) -> Page {
    let dom = parse_html(&input.html);
    if collapse {
        collapse_whitespace_rcdom(&dom.document);
    }

    Page {
        title: input
            .title
            .unwrap_or_else(|| title(&dom).unwrap_or_default()),
        url: input.url,
        keywords: input.keywords,
        tree: PageTree::ParsedTree(dom),
    }
}

fn show(page: &ReadPage) -> Result<serde_json::Value, CliError> {
    Ok(json!({
        "position": page.position,
        "next_position": page.next_position(),
        "metadata": page.metadata,
        "html": page.document().to_html()?,
    }))
}

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
    }
}

fn write_line<W: Write>(out: &mut W, value: &serde_json::Value) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}
