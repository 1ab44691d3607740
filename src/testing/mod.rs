mod recording_provisioner;

pub use recording_provisioner::RecordingProvisioner;
