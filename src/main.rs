//! Command-line front end for the annotation store.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use attrstore::{
    AnnotationStore, BatchCursor, BatchSize, LabelGroup, Partition, StoreConfig, StoreError,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "attrstore", version, about = "Attribute annotation dataset store")]
struct Opts {
    /// snapshot file
    #[arg(short, long)]
    snapshot: PathBuf,
    /// configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// image root directory, replaces the stored root
    #[arg(short, long)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the snapshot if it does not exist
    Init {
        /// dataset description
        #[arg(long)]
        description: Option<String>,
    },
    /// Print a summary of the dataset
    Info,
    AddLabel {
        name: String,
        /// value for every existing image
        #[arg(long, default_value_t = 0)]
        default: u8,
    },
    EditLabel {
        index: usize,
        name: String,
    },
    RemoveLabel {
        index: usize,
    },
    AddImage {
        /// image path or name relative to the root
        path: String,
        /// comma separated 0/1 values, one per label
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<u8>>,
        /// move the file into the root first
        #[arg(long)]
        import: bool,
    },
    RemoveImage {
        index: usize,
    },
    SetLabels {
        index: usize,
        #[arg(value_delimiter = ',')]
        labels: Vec<u8>,
    },
    ClearLabels {
        index: usize,
    },
    /// Add an image to a partition, or remove it with --remove
    Partition {
        index: usize,
        partition: Partition,
        #[arg(long)]
        remove: bool,
    },
    /// Replace the label columns of a group (eval, color or extra)
    LabelGroup {
        group: LabelGroup,
        /// comma separated label indices, empty to clear
        #[arg(value_delimiter = ',')]
        columns: Vec<usize>,
    },
    /// Print image names with their labels and partitions
    List {
        /// names per page, -1 for all
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        batch: i64,
        /// print paths joined with the root
        #[arg(long)]
        full_path: bool,
    },
    /// Recompute class weights
    Weights,
    /// Reassign partitions by the configured split ratios
    Split,
    ExportNpy {
        output: PathBuf,
    },
    ExportPartitions {
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    match run(opts, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Application error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(opts: &Opts) -> Result<StoreConfig, StoreError> {
    let mut config = match &opts.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::load_from_default_path().unwrap_or_default(),
    };
    if let Some(root) = &opts.root {
        config.root = Some(root.clone());
    }
    if let Command::Init {
        description: Some(description),
    } = &opts.command
    {
        config.description = Some(description.clone());
    }
    Ok(config)
}

fn run(opts: Opts, config: StoreConfig) -> Result<(), StoreError> {
    let mut store = AnnotationStore::open(opts.snapshot, config)?;

    match opts.command {
        Command::Init { .. } => {
            println!("Dataset at {}", store.snapshot_path().display());
        }
        Command::Info => info(&store),
        Command::AddLabel { name, default } => {
            let index = store.add_label_with_default(&name, default)?;
            println!("{}", index);
        }
        Command::EditLabel { index, name } => store.edit_label(index, &name)?,
        Command::RemoveLabel { index } => store.remove_label(index)?,
        Command::AddImage {
            path,
            labels,
            import,
        } => {
            let index = if import {
                store.import_image(Path::new(&path), labels.as_deref())?
            } else {
                store.add_image_with_labels(&path, labels.as_deref())?
            };
            println!("{}", index);
        }
        Command::RemoveImage { index } => store.remove_image(index)?,
        Command::SetLabels { index, labels } => store.edit_label_for_image(index, &labels)?,
        Command::ClearLabels { index } => store.remove_label_from_image(index)?,
        Command::Partition {
            index,
            partition,
            remove,
        } => {
            let changed = if remove {
                store.unassign_partition(index, partition)?
            } else {
                store.assign_partition(index, partition)?
            };
            if !changed {
                println!("unchanged");
            }
        }
        Command::LabelGroup { group, columns } => store.set_label_group(group, columns)?,
        Command::List { batch, full_path } => list(&store, batch, full_path)?,
        Command::Weights => {
            store.update_class_weights()?;
            let ann = store.annotation();
            let weights = ann.weight_train.iter().zip(&ann.weight_trainval);
            for (name, (train, trainval)) in ann.attr_name.iter().zip(weights) {
                println!("{}\t{:.4}\t{:.4}", name, train, trainval);
            }
        }
        Command::Split => {
            let split = store.config().split;
            println!(
                "split train {:.2} / val {:.2} / test {:.2}",
                split.train,
                split.val,
                split.test()
            );
            store.apply_split()?;
            info(&store);
        }
        Command::ExportNpy { output } => store.export_labels_npy(&output)?,
        Command::ExportPartitions { output } => store.export_partitions(&output)?,
    }

    Ok(())
}

fn info(store: &AnnotationStore) {
    let ann = store.annotation();
    println!("description: {}", ann.description);
    println!("root:        {}", ann.root.display());
    println!("images:      {}", store.num_images());
    println!("labels:      {}", store.num_labels());
    for &partition in Partition::all() {
        println!("{:<12} {}", format!("{}:", partition), store.partition(partition).len());
    }
    let counts = store.label_counts();
    for (name, count) in store.dataset_labels().iter().zip(counts) {
        println!("  {:<24} {}", name, count);
    }
}

fn list(store: &AnnotationStore, batch: i64, full_path: bool) -> Result<(), StoreError> {
    let size = BatchSize::from_signed(batch)?;
    let mut cursor = Some(BatchCursor::start());

    while let Some(current) = cursor {
        let page = store.fetch_batch_of_image_paths(current, size)?;
        for (offset, name) in page.names.iter().enumerate() {
            let index = current.offset() + offset;
            let labels = store.labels_for_image(index)?;
            let shown = if full_path {
                store.root().join(name)
            } else {
                PathBuf::from(name)
            };
            let partitions: Vec<&str> = store
                .annotation()
                .partition
                .memberships(index)
                .iter()
                .map(|p| p.name())
                .collect();
            println!(
                "{}\t{}\t{:?}\t{}",
                index,
                shown.display(),
                labels,
                partitions.join(",")
            );
        }
        cursor = page.next;
    }
    Ok(())
}
