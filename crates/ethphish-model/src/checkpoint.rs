//! Checkpoint save/load for candle variable maps (safetensors)

use candle_core::Device;
use candle_nn::VarMap;
use ethphish_core::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Path of the fine-tuned checkpoint for a run
pub fn finetune_checkpoint_path(checkpoint_dir: impl AsRef<Path>, bizdate: &str) -> PathBuf {
    checkpoint_dir
        .as_ref()
        .join(format!("bert_finetune_{}.safetensors", bizdate))
}

/// Write every variable to `path`, creating parent directories
pub fn save_checkpoint(varmap: &VarMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    varmap.save(path).map_err(|e| {
        Error::checkpoint(format!("Failed to save checkpoint {}: {}", path.display(), e))
    })?;
    info!("Saved checkpoint to {}", path.display());
    Ok(())
}

/// Load every variable from `path`; a missing variable is an error
pub fn load_checkpoint(varmap: &mut VarMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::checkpoint(format!(
            "Checkpoint not found: {}",
            path.display()
        )));
    }

    varmap.load(path).map_err(|e| {
        Error::checkpoint(format!("Failed to load checkpoint {}: {}", path.display(), e))
    })?;
    info!("Restored checkpoint from {}", path.display());
    Ok(())
}

/// Initialize the variables that also exist in `path` with a matching shape.
///
/// Variables absent from the checkpoint keep their fresh initialization,
/// which is how a pretrained encoder is combined with a new head. Returns
/// the names that were initialized.
pub fn init_from_checkpoint(
    varmap: &VarMap,
    path: impl AsRef<Path>,
    device: &Device,
) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let tensors = candle_core::safetensors::load(path, device).map_err(|e| {
        Error::checkpoint(format!("Failed to read checkpoint {}: {}", path.display(), e))
    })?;

    let data = varmap
        .data()
        .lock()
        .map_err(|_| Error::checkpoint("variable map lock poisoned"))?;

    let mut initialized = BTreeSet::new();
    for (name, var) in data.iter() {
        let Some(tensor) = tensors.get(name) else {
            continue;
        };
        if tensor.shape() != var.shape() {
            warn!(
                "Skipping {}: checkpoint shape {:?} != variable shape {:?}",
                name,
                tensor.dims(),
                var.dims()
            );
            continue;
        }
        var.set(&tensor.to_dtype(var.dtype())?)?;
        initialized.insert(name.clone());
    }

    info!(
        "Initialized {} of {} variables from {}",
        initialized.len(),
        data.len(),
        path.display()
    );
    Ok(initialized)
}

/// Log every trainable variable, marking those restored from a checkpoint
pub fn log_trainable_variables(varmap: &VarMap, initialized: &BTreeSet<String>) {
    let Ok(data) = varmap.data().lock() else {
        return;
    };

    let mut names: Vec<_> = data.keys().collect();
    names.sort();

    info!("**** Trainable Variables ****");
    for name in names {
        let marker = if initialized.contains(name) {
            ", *INIT_FROM_CKPT*"
        } else {
            ""
        };
        info!("  name = {}, shape = {:?}{}", name, data[name].dims(), marker);
    }
}
