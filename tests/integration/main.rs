//! Integration tests for node-engine

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use predicates::prelude::*;
    use sha2::{Digest, Sha256};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const PLATFORM_VARS: [&str; 6] = [
        "BP_NODE_VERSION",
        "BP_NODE_OPTIMIZE_MEMORY",
        "OPTIMIZE_MEMORY",
        "BP_NODE_PROJECT_PATH",
        "CNB_STACK_ID",
        "CNB_BUILDPACK_DIR",
    ];

    fn node_engine() -> Command {
        let mut cmd = cargo_bin_cmd!("node-engine");
        for var in PLATFORM_VARS {
            cmd.env_remove(var);
        }
        cmd.env("CNB_STACK_ID", "test-stack");
        cmd
    }

    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        /// App dir, buildpack dir with a two-release catalog, empty layers dir
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let ws = Self { temp };
            std::fs::create_dir_all(ws.app()).unwrap();
            std::fs::create_dir_all(ws.buildpack().join("deps")).unwrap();
            std::fs::create_dir_all(ws.layers()).unwrap();

            let mut catalog = String::from(
                r#"[buildpack]
id = "node-engine"
name = "Node Engine Buildpack"
version = "0.9.0"

[metadata.default-versions]
node = "12.*"
"#,
            );
            for version in ["10.18.1", "12.4.0"] {
                let archive = archive(version);
                let checksum = hex::encode(Sha256::digest(&archive));
                std::fs::write(ws.buildpack().join(format!("deps/node-{version}.tgz")), archive)
                    .unwrap();
                catalog.push_str(&format!(
                    r#"
[[metadata.dependencies]]
id = "node"
name = "Node Engine"
version = "{version}"
sha256 = "{checksum}"
uri = "file://deps/node-{version}.tgz"
stacks = ["test-stack"]
"#
                ));
            }
            std::fs::write(ws.buildpack().join("buildpack.toml"), catalog).unwrap();
            ws
        }

        fn app(&self) -> PathBuf {
            self.temp.path().join("app")
        }

        fn buildpack(&self) -> PathBuf {
            self.temp.path().join("buildpack")
        }

        fn layers(&self) -> PathBuf {
            self.temp.path().join("layers")
        }

        fn build(&self) -> Command {
            let mut cmd = node_engine();
            cmd.arg("build")
                .arg("--working-dir")
                .arg(self.app())
                .arg("--buildpack-dir")
                .arg(self.buildpack())
                .arg("--layers-dir")
                .arg(self.layers());
            cmd
        }
    }

    fn archive(version: &str) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let content = format!("#!/bin/sh\necho v{version}\n");
        let mut header = tar::Header::new_gnu();
        header
            .set_path(format!("node-v{version}-linux-x64/bin/node"))
            .unwrap();
        header.set_mode(0o755);
        header.set_size(content.len() as u64);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn help_displays() {
        node_engine()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Node.js runtime"));
    }

    #[test]
    fn version_displays() {
        node_engine()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("node-engine"));
    }

    #[test]
    fn detect_prints_plan() {
        let ws = Workspace::new();
        std::fs::write(ws.app().join(".nvmrc"), "lts/dubnium\n").unwrap();

        node_engine()
            .args(["detect", "--working-dir"])
            .arg(ws.app())
            .assert()
            .success()
            .stdout(predicate::str::contains("[[provides]]"))
            .stdout(predicate::str::contains(r#"version = "10.*""#))
            .stdout(predicate::str::contains(r#"version-source = ".nvmrc""#));
    }

    #[test]
    fn detect_writes_plan_file() {
        let ws = Workspace::new();
        let plan = ws.temp.path().join("plan.toml");

        node_engine()
            .args(["detect", "--working-dir"])
            .arg(ws.app())
            .arg("--plan")
            .arg(&plan)
            .env("BP_NODE_VERSION", "~10")
            .assert()
            .success();

        let content = read(&plan);
        assert!(content.contains(r#"version-source = "BP_NODE_VERSION""#));
        assert!(content.contains(r#"version = "~10""#));
    }

    #[test]
    fn detect_rejects_malformed_version() {
        let ws = Workspace::new();
        std::fs::write(ws.app().join(".node-version"), "not a version\n").unwrap();

        node_engine()
            .args(["detect", "--working-dir"])
            .arg(ws.app())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn detect_missing_project_path() {
        let ws = Workspace::new();

        node_engine()
            .args(["detect", "--working-dir"])
            .arg(ws.app())
            .env("BP_NODE_PROJECT_PATH", "does-not-exist")
            .assert()
            .failure()
            .stderr(predicate::str::contains("BP_NODE_PROJECT_PATH"));
    }

    #[test]
    fn build_installs_then_reuses() {
        let ws = Workspace::new();
        std::fs::write(ws.app().join(".node-version"), "10\n").unwrap();

        ws.build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Node Engine Buildpack 0.9.0"))
            .stdout(predicate::str::contains(
                "Selected Node Engine version (using .node-version): 10.18.1",
            ))
            .stdout(predicate::str::contains("Executing build process"));

        assert_eq!(
            read(&ws.layers().join("node/bin/node")),
            "#!/bin/sh\necho v10.18.1\n"
        );
        assert_eq!(read(&ws.layers().join("node/env/NODE_ENV.override")), "production");
        let record = read(&ws.layers().join("node.toml"));
        assert!(record.contains("dependency-sha"));
        assert!(record.contains("launch = true"));

        ws.build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"));
    }

    #[test]
    fn build_writes_bill_of_materials() {
        let ws = Workspace::new();
        let plan = ws.temp.path().join("plan.toml");
        std::fs::write(
            &plan,
            r#"
[[entries]]
name = "node"
[entries.metadata]
version = "12.*"
version-source = "package.json"
launch = true
"#,
        )
        .unwrap();

        ws.build().arg("--plan").arg(&plan).assert().success();

        let bom = read(&plan);
        assert!(bom.contains(r#"version = "12.4.0""#));
        assert!(bom.contains("sha256"));
        assert!(bom.contains(r#"uri = "file://deps/node-12.4.0.tgz""#));
    }

    #[test]
    fn build_with_optimize_memory() {
        let ws = Workspace::new();

        ws.build()
            .env("BP_NODE_OPTIMIZE_MEMORY", "true")
            .assert()
            .success()
            .stdout(predicate::str::contains("Writing profile.d/1_optimize_memory.sh"));

        assert!(ws.layers().join("node/profile.d/1_optimize_memory.sh").is_file());
    }

    #[test]
    fn build_no_compatible_version() {
        let ws = Workspace::new();
        std::fs::write(ws.app().join(".nvmrc"), "16\n").unwrap();

        ws.build()
            .assert()
            .failure()
            .stderr(predicate::str::contains("no compatible versions"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn build_checksum_mismatch() {
        let ws = Workspace::new();
        std::fs::write(ws.buildpack().join("deps/node-12.4.0.tgz"), archive("12.0.0")).unwrap();

        ws.build()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Checksum does not match"));

        let record = read(&ws.layers().join("node.toml"));
        assert!(!record.contains("dependency-sha"));
    }

    #[test]
    fn resolve_json() {
        let ws = Workspace::new();
        std::fs::write(ws.app().join(".nvmrc"), "10\n").unwrap();

        let output = node_engine()
            .args(["resolve", "--format", "json", "--working-dir"])
            .arg(ws.app())
            .arg("--buildpack-dir")
            .arg(ws.buildpack())
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["selected"]["version"], "10.18.1");
        assert_eq!(json["platform"], "test-stack");
        assert_eq!(json["candidates"][0]["source"], ".nvmrc");
        assert!(!ws.layers().join("node.toml").exists());
    }

    #[test]
    fn resolve_text_uses_buildpack_dir_env() {
        let ws = Workspace::new();

        node_engine()
            .args(["resolve", "--working-dir"])
            .arg(ws.app())
            .env("CNB_BUILDPACK_DIR", ws.buildpack())
            .assert()
            .success()
            .stdout(predicate::str::contains("12.4.0"))
            .stdout(predicate::str::contains("<unknown>"));
    }
}
