#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    curve_protect::init_logger();
    if let Err(err) = native::run() {
        eprintln!("protect_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use curve_protect::geom::{GeomMesh, Point3, open_box, planar_grid, polygon_fan};
    use curve_protect::protect::{
        BallId, Polyline, PowerIndex, ProtectDiagnostics, ProtectOptions, Protector, WeightedIndex,
        protect_mesh,
    };
    use std::fmt::Write as _;

    const USAGE: &str = r#"protect_cli (curve-protect)

USAGE:
  protect_cli list
  protect_cli run <scenario|all> [options]

SCENARIOS:
  straight_line
  square_cycle
  shared_corner
  open_box
  fan_disk
  grid

OPTIONS (run):
  --size <f64>           Target ball size (default 1.0)
  --max-restarts <n>     Separation restart budget
  --recover-gaps         Re-cover gaps next to shrunk balls
  --no-sharp-corners     Only split the border at incidence corners
  --balls                Print every ball after the summary
  -h, --help             Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_scenarios();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_scenarios() {
        for scenario in Scenario::ALL {
            println!("{}", scenario.name());
        }
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut options = ProtectOptions::new(1.0);
        let mut print_balls = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--size" => options.target_ball_size = args.parse("--size")?,
                "--max-restarts" => options.max_restarts = args.parse("--max-restarts")?,
                "--recover-gaps" => options.recover_gaps = true,
                "--no-sharp-corners" => options.extract.detect_sharp_corners = false,
                "--balls" => print_balls = true,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }
        options.validate().map_err(|e| e.to_string())?;

        if scenario_name == "all" {
            for scenario in Scenario::ALL {
                run_and_print(*scenario, &options, print_balls)?;
            }
            return Ok(());
        }

        let scenario =
            Scenario::from_str(scenario_name.as_str()).ok_or_else(|| unknown_scenario(&scenario_name))?;
        run_and_print(scenario, &options, print_balls)
    }

    fn run_and_print(scenario: Scenario, options: &ProtectOptions, print_balls: bool) -> Result<(), String> {
        let output = run_scenario(scenario, options)?;
        print!("{}", output.render(print_balls));
        eprintln!("{}: {}", output.name, output.diagnostics.summary());
        Ok(())
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = String::new();
        let _ = writeln!(msg, "unknown scenario `{name}`\n\navailable scenarios:");
        for scenario in Scenario::ALL {
            let _ = writeln!(msg, "  {}", scenario.name());
        }
        msg
    }

    struct ScenarioOutput {
        name: &'static str,
        index: PowerIndex,
        chains: Vec<Vec<BallId>>,
        diagnostics: ProtectDiagnostics,
    }

    impl ScenarioOutput {
        fn render(&self, print_balls: bool) -> String {
            let mut out = String::new();
            let _ = writeln!(out, "scenario {}", self.name);
            let _ = write!(out, "{}", self.diagnostics);
            for (id, chain) in self.chains.iter().enumerate() {
                let _ = writeln!(out, "chain.{id} {} balls", chain.len());
            }
            if print_balls {
                for (ball, point, context) in self.index.balls() {
                    let _ = writeln!(
                        out,
                        "ball {ball} polyline={} corner={} center=({:.6}, {:.6}, {:.6}) radius={:.6}",
                        context.polyline,
                        context.is_corner,
                        point.center.x,
                        point.center.y,
                        point.center.z,
                        point.radius()
                    );
                }
            }
            out
        }
    }

    fn run_scenario(scenario: Scenario, options: &ProtectOptions) -> Result<ScenarioOutput, String> {
        match scenario {
            Scenario::StraightLine => run_polylines(
                scenario,
                vec![polyline(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], false)],
                options,
            ),
            Scenario::SquareCycle => run_polylines(
                scenario,
                vec![polyline(
                    &[
                        [0.0, 0.0, 0.0],
                        [4.0, 0.0, 0.0],
                        [4.0, 4.0, 0.0],
                        [0.0, 4.0, 0.0],
                        [0.0, 0.0, 0.0],
                    ],
                    true,
                )],
                options,
            ),
            Scenario::SharedCorner => run_polylines(
                scenario,
                vec![
                    polyline(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]], false),
                    polyline(&[[0.0, 0.0, 0.0], [0.0, 5.0, 0.0]], false),
                    polyline(&[[1.0, 1.0, 0.5], [5.0, 5.0, 0.5]], false),
                ],
                options,
            ),
            Scenario::OpenBox => run_mesh(scenario, &open_box(4.0), options),
            Scenario::FanDisk => run_mesh(scenario, &polygon_fan(Point3::ORIGIN, 3.0, 24), options),
            Scenario::Grid => run_mesh(scenario, &planar_grid(6, 4, 1.0), options),
        }
    }

    fn polyline(points: &[[f64; 3]], is_cycle: bool) -> Polyline {
        Polyline::new(points.iter().copied().map(Point3::from).collect(), is_cycle)
    }

    fn run_polylines(
        scenario: Scenario,
        polylines: Vec<Polyline>,
        options: &ProtectOptions,
    ) -> Result<ScenarioOutput, String> {
        let mut index = PowerIndex::new();
        let mut protector = Protector::new(&mut index, polylines, *options);
        protector.cover_all();
        protector.separate_balls().map_err(|e| e.to_string())?;
        protector.verify().map_err(|e| e.to_string())?;

        let chains = (0..protector.polylines().len())
            .map(|id| protector.chain(id))
            .collect();
        let mut diagnostics = protector.diagnostics().clone();
        diagnostics.protecting_balls = protector.index().number_of_vertices();
        diagnostics.corner_balls = protector.registry().corner_count();

        Ok(ScenarioOutput {
            name: scenario.name(),
            index,
            chains,
            diagnostics,
        })
    }

    fn run_mesh(
        scenario: Scenario,
        mesh: &GeomMesh,
        options: &ProtectOptions,
    ) -> Result<ScenarioOutput, String> {
        let mut index = PowerIndex::new();
        let report = protect_mesh(&mut index, mesh, options).map_err(|e| e.to_string())?;
        Ok(ScenarioOutput {
            name: scenario.name(),
            index,
            chains: report.chains,
            diagnostics: report.diagnostics,
        })
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        StraightLine,
        SquareCycle,
        SharedCorner,
        OpenBox,
        FanDisk,
        Grid,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::StraightLine,
            Scenario::SquareCycle,
            Scenario::SharedCorner,
            Scenario::OpenBox,
            Scenario::FanDisk,
            Scenario::Grid,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::StraightLine => "straight_line",
                Scenario::SquareCycle => "square_cycle",
                Scenario::SharedCorner => "shared_corner",
                Scenario::OpenBox => "open_box",
                Scenario::FanDisk => "fan_disk",
                Scenario::Grid => "grid",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            Scenario::ALL.iter().copied().find(|s| s.name() == name)
        }
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }

        fn parse<T: std::str::FromStr>(&mut self, flag: &str) -> Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            let raw = self.value(flag)?;
            raw.parse()
                .map_err(|e| format!("invalid value `{raw}` for {flag}: {e}"))
        }
    }
}
