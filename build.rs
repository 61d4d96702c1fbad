fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Use the bundled protoc unless the environment provides one
  if std::env::var_os("PROTOC").is_none() {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
  }

  let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);
  tonic_build::configure()
    .file_descriptor_set_path(out_dir.join("users_descriptor.bin"))
    .compile(
      &["proto/users.proto"],
      &[
        std::path::PathBuf::from("proto"),
        protoc_bin_vendored::include_path()?,
      ],
    )?;

  println!("cargo:rerun-if-changed=proto/users.proto");
  println!("cargo:rerun-if-changed=migrations");
  Ok(())
}
