use clap::Parser;
use repomod_core::{
    move_file, move_symbol, rename_file, rename_symbol, MoveOptions, OutputFormatter, RefactorError,
    RefactorOptions, RefactorResult,
};
use std::process;

mod cli;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let format = repomod_core::OutputFormat::from(cli.format);

    let result = match &cli.command {
        Commands::RenameSymbol { target, new_name } => rename_symbol(
            &cli.root,
            target,
            new_name,
            &RefactorOptions {
                extension: cli.extension.clone(),
                dry_run: cli.dry_run,
            },
        ),

        Commands::MoveSymbol {
            target,
            dest_file,
            policy,
            shared_file,
        } => move_symbol(
            &cli.root,
            target,
            dest_file,
            &MoveOptions {
                extension: cli.extension.clone(),
                dry_run: cli.dry_run,
                policy: (*policy).into(),
                shared_file_path: shared_file.clone(),
            },
        ),

        Commands::RenameFile { file, new_stem } => rename_file(
            &cli.root,
            file,
            new_stem,
            &RefactorOptions {
                extension: cli.extension.clone(),
                dry_run: cli.dry_run,
            },
        ),

        Commands::MoveFile { file, dest_dir } => move_file(
            &cli.root,
            file,
            dest_dir,
            &RefactorOptions {
                extension: cli.extension.clone(),
                dry_run: cli.dry_run,
            },
        ),
    };

    match result {
        Ok(result) => print_result(&result, format),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(exit_code_for(&err));
        },
    }
}

fn print_result(result: &RefactorResult, format: repomod_core::OutputFormat) {
    match format {
        repomod_core::OutputFormat::Json => print!("{}", result.format_json()),
        repomod_core::OutputFormat::Text => print!("{}", result.format_text()),
    }
}

fn exit_code_for(err: &RefactorError) -> i32 {
    match err {
        RefactorError::TargetParse { .. } => 2,
        RefactorError::SymbolNotFound { .. } | RefactorError::AmbiguousSymbol { .. } => 3,
        RefactorError::CircularDependency { .. } => 4,
        RefactorError::Refactoring { .. } => 1,
    }
}
