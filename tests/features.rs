use moneyball_scout::dataset::Population;
use moneyball_scout::demo::demo_population;
use moneyball_scout::features::{
    COMMON_FEATURES, FeatureMatrix, FeatureSet, MissingPolicy, Scaling, VectorizerConfig,
};
use moneyball_scout::player::{PlayerId, Position};

const NO_PRGR: &str = "\
Rk,Player,Pos,Squad,Comp,Gls,Ast,G+A,xG,xAG,Cmp,Att,PrgP,Tkl,TklW,Int,Touches,Carries,PrgC,90s
1,A,FW,X,L,10,2,12,8.5,1.9,200,260,30,10,6,4,600,300,40,20.0
2,B,DF,Y,L,1,1,2,0.9,0.7,1500,1700,120,60,40,50,2000,1200,15,30.0
3,C,MF,Z,L,4,,9,3.1,4.4,1100,1300,150,45,30,28,1800,1000,35,25.0
";

#[test]
fn missing_feature_column_is_a_data_error() {
    let pop = Population::from_reader(NO_PRGR.as_bytes()).unwrap();
    let err = FeatureMatrix::build(&pop, &VectorizerConfig::default()).unwrap_err();
    assert!(err.is_data());
    assert!(err.to_string().contains("PrgR"));
}

#[test]
fn partial_mode_drops_absent_columns() {
    let pop = Population::from_reader(NO_PRGR.as_bytes()).unwrap();
    let config = VectorizerConfig {
        allow_partial: true,
        ..VectorizerConfig::default()
    };
    let matrix = FeatureMatrix::build(&pop, &config).unwrap();
    assert_eq!(matrix.dimension(), COMMON_FEATURES.len() - 1);
    assert!(matrix.fields().iter().all(|f| f != "PrgR"));
}

#[test]
fn empty_cells_follow_the_missing_policy() {
    let pop = Population::from_reader(NO_PRGR.as_bytes()).unwrap();
    let base = VectorizerConfig {
        features: FeatureSet::Custom(vec!["Ast".to_string()]),
        ..VectorizerConfig::default()
    };
    // Ast: 2, 1, missing
    let zero = FeatureMatrix::build(&pop, &base).unwrap();
    assert_eq!(zero.vector(PlayerId(3)).unwrap(), &[0.0]);

    let mean = FeatureMatrix::build(
        &pop,
        &VectorizerConfig {
            missing: MissingPolicy::Mean,
            ..base
        },
    )
    .unwrap();
    assert_eq!(mean.vector(PlayerId(3)).unwrap(), &[0.5]);
}

#[test]
fn zscore_columns_are_centred() {
    let pop = demo_population(300, 7).unwrap();
    let config = VectorizerConfig {
        scaling: Scaling::ZScore,
        ..VectorizerConfig::default()
    };
    let matrix = FeatureMatrix::build(&pop, &config).unwrap();
    for col in 0..matrix.dimension() {
        let mean: f64 =
            (0..matrix.len()).map(|r| matrix.vector_at(r)[col]).sum::<f64>() / matrix.len() as f64;
        assert!(mean.abs() < 1e-9, "column {col} mean {mean}");
    }
}

#[test]
fn position_feature_sets_build_on_demo_data() {
    let pop = demo_population(200, 3).unwrap();
    for pos in Position::ALL {
        let config = VectorizerConfig {
            features: FeatureSet::for_position(pos),
            ..VectorizerConfig::default()
        };
        let matrix = FeatureMatrix::build(&pop, &config).unwrap();
        assert_eq!(matrix.len(), 200);
        assert_eq!(matrix.dimension(), FeatureSet::for_position(pos).fields().len());
    }
}

#[test]
fn transform_uses_population_parameters() {
    let pop = Population::from_reader(NO_PRGR.as_bytes()).unwrap();
    let config = VectorizerConfig {
        features: FeatureSet::Custom(vec!["Gls".to_string()]),
        ..VectorizerConfig::default()
    };
    let matrix = FeatureMatrix::build(&pop, &config).unwrap();
    // Gls spans 1..=10
    assert_eq!(matrix.transform(&[Some(10.0)]).unwrap(), vec![1.0]);
    assert_eq!(matrix.transform(&[Some(5.5)]).unwrap(), vec![0.5]);
    assert!(matrix.transform(&[Some(1.0), Some(2.0)]).unwrap_err().is_data());
}
