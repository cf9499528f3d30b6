/*!
 * Signer subprocess
 *
 * Serves one key custody operation against the sealed key file and exits with
 * the IPC exit code. Nothing but the reply is written to stdout.
 */

use std::path::Path;
use tokio::io::AsyncReadExt;
use ztna_agent::{AgentError, DmiFingerprintSource, FingerprintSource, LocalState};
use ztna_keystore::{
    ipc::{self, SignerOp, SignerReply, EXIT_FAILURE, EXIT_OK},
    FileKeyStore,
};

pub async fn serve(home: &Path, op: SignerOp) -> ! {
    let reply = match handle(home, op).await {
        Ok(reply) => reply,
        Err(e) => SignerReply {
            exit_code: EXIT_FAILURE,
            output: e.to_string(),
        },
    };

    if reply.exit_code == EXIT_OK {
        println!("{}", reply.output);
    } else {
        eprintln!("{}", reply.output);
    }
    std::process::exit(reply.exit_code)
}

async fn handle(home: &Path, op: SignerOp) -> Result<SignerReply, AgentError> {
    let fingerprint = DmiFingerprintSource::default().compute_fingerprint()?;
    let store = FileKeyStore::new(LocalState::new(home).keys_dir(), &fingerprint.fingerprint_hash);

    let mut input = String::new();
    if op == SignerOp::Sign {
        tokio::io::stdin().read_to_string(&mut input).await?;
    }

    Ok(ipc::serve(&store, op, &input).await)
}
