mod daemon;

use log::error;
use std::env;
use std::path::PathBuf;

use crate::daemon::{run_daemon, RunOptions};

fn usage() -> String {
    "usage: kubefs <mountpoint> [--kubeconfig <path>] [--allow-exec <context>]... \
     [--allow-other] [--debug]\n\
     \n\
     --kubeconfig <path>     kubeconfig to read contexts from (default: the\n\
     \x20                        client library's resolution)\n\
     --allow-exec <context>  allow the exec command file on this context;\n\
     \x20                        repeatable, exec is disabled by default\n\
     --allow-other           pass allow_other to the mount\n\
     --debug                 log at debug level"
        .to_string()
}

fn parse_args(args: Vec<String>) -> Result<RunOptions, String> {
    if args.is_empty() || args[0] == "-h" || args[0] == "--help" {
        return Err(usage());
    }

    let mut options = RunOptions {
        mountpoint: PathBuf::from(args[0].clone()),
        kubeconfig: None,
        allow_exec: Vec::new(),
        allow_other: false,
        debug: false,
    };

    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--kubeconfig" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "missing value for --kubeconfig".to_string())?;
                options.kubeconfig = Some(PathBuf::from(value));
            }
            "--allow-exec" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "missing value for --allow-exec".to_string())?;
                options.allow_exec.push(value.clone());
            }
            "--allow-other" => {
                options.allow_other = true;
            }
            "--debug" => {
                options.debug = true;
            }
            other => {
                return Err(format!("unknown argument: {}\n{}", other, usage()));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn main() {
    let options = match parse_args(env::args().skip(1).collect()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    if options.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(err) = run_daemon(options) {
        error!("run kubefs failed: {}", err);
        std::process::exit(1);
    }
}
