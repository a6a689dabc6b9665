//! A git-like command line.
//!
//! ```text
//! cargo run --example git_demo -- -config demos/git.json commit -m "fix" --branch stable
//! cargo run --example git_demo -- remote add -name origin -url git@host:repo
//! ```

use flagbind::{ErrorHandling, FlagError, FlagSet, cfg, enums, env, short};

fn main() -> Result<(), FlagError> {
    let mut git = FlagSet::new("git", ErrorHandling::Exit);
    let verbose = git.bool("verbose", false, "print more", [short("v")])?;
    let config = git.string("config", "", "load settings from `file`", [])?;
    let author = git.string(
        "author",
        "anonymous",
        "commit author",
        [env(["GIT_AUTHOR_NAME"]), cfg(["user.name"])],
    )?;

    let commit_author = author.clone();
    git.sub_cmd_with_description("commit", "record changes", move |commit, args| {
        let message = commit.string("message", "", "commit message", [short("m")])?;
        let branch = commit.string("branch", "master", "target branch", [cfg(["commit.branch"])])?;
        let mode = commit.string(
            "cleanup",
            "strip",
            "message cleanup mode",
            [enums(["strip", "whitespace", "verbatim"])],
        )?;
        commit.parse(args)?;
        println!(
            "commit by {} on {}: {:?} (cleanup {})",
            commit_author.get(),
            branch.get(),
            message.get(),
            mode.get()
        );
        Ok(())
    })?;

    git.sub_cmd_with_description("remote", "manage remotes", |remote, args| {
        remote.sub_cmd("add", |add, args| {
            let name = add.string("name", "origin", "remote name", [])?;
            let url = add.string("url", "", "remote `url`", [short("u")])?;
            add.parse(args)?;
            println!("added remote {} -> {}", name.get(), url.get());
            Ok(())
        })?;
        remote.sub_cmd("list", |_, _| {
            println!("origin");
            Ok(())
        })?;
        remote.parse(args)
    })?;

    // Global flags come before the sub-command name. Parse them first so a
    // config file can be loaded before the sub-command runs; values given
    // on the command line keep precedence over the file.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let split = args
        .iter()
        .position(|a| !a.starts_with('-') && git.sub_command(a).is_some())
        .unwrap_or(args.len());
    let (global, rest) = args.split_at(split);

    git.parse(global)?;
    if !config.get().is_empty() {
        git.load_cfg(config.get())?;
    }
    if verbose.get() {
        eprintln!("author: {}", author.get());
    }
    git.parse(rest)
}
