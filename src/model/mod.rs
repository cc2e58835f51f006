use std::collections::BTreeMap;

/// Pairs an API field identifier with the spreadsheet header shown for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in the API payload.
    pub key: &'static str,
    /// Header label written to the exported sheet.
    pub label: &'static str,
}

const fn field(key: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { key, label }
}

/// Describes one family of exported records: which fields to pull out of each
/// raw item, how to label them, and how to name the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Worksheet name used when exporting.
    pub sheet_name: &'static str,
    /// Suffix appended to generated output filenames.
    pub file_suffix: &'static str,
    /// Ordered field list. Header label `i` belongs to field `i`.
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    /// Returns the header labels in export order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.fields.iter().map(|spec| spec.label).collect()
    }

    /// Looks up the field spec for an API field name.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }
}

/// Bid notices from `BidPublicInfoService`.
pub const BID_NOTICE: RecordSchema = RecordSchema {
    sheet_name: "입찰공고",
    file_suffix: "입찰공고",
    fields: &[
        field("bidNtceNo", "입찰공고번호"),
        field("rgstTyNm", "등록유형명"),
        field("ntceKindNm", "공고종류명"),
        field("bidNtceDt", "입찰공고일시"),
        field("bidNtceNm", "입찰공고명"),
        field("ntceInsttCd", "공고기관코드"),
        field("ntceInsttNm", "공고기관명"),
        field("dminsttCd", "수요기관코드"),
        field("dminsttNm", "수요기관명"),
        field("ntceInsttOfclNm", "공고기관담당자명"),
        field("ntceInsttOfclTelNo", "공고기관담당자전화번호"),
        field("ntceInsttOfclEmailAdrs", "공고기관담당자이메일주소"),
        field("exctvNm", "집행관명"),
        field("bidQlfctRgstDt", "입찰참가자격등록마감일시"),
        field("bidBeginDt", "입찰개시일시"),
        field("bidClseDt", "입찰마감일시"),
        field("opengDt", "개찰일시"),
    ],
};

/// Order plans from `OrderPlanSttusService`.
pub const ORDER_PLAN: RecordSchema = RecordSchema {
    sheet_name: "발주계획",
    file_suffix: "발주계획",
    fields: &[
        field("bsnsDivNm", "업무구분명"),
        field("orderInsttCd", "발주기관코드"),
        field("totlmngInsttNm", "총괄기관명"),
        field("jrsdctnDivNm", "관할구분명"),
        field("orderInsttNm", "발주기관명"),
        field("prcrmntMethd", "조달방식"),
        field("bizNm", "사업명"),
        field("cntrctMthdNm", "계약방법명"),
        field("sumOrderAmt", "합계발주금액"),
        field("deptNm", "부서명"),
        field("ofclNm", "담당자명"),
        field("telNo", "전화번호"),
        field("nticeDt", "공고일자"),
        field("orderPlanUntyNo", "발주계획통합번호"),
    ],
};

/// Contact columns read back from an exported bid-notice sheet.
pub const CONTACT: RecordSchema = RecordSchema {
    sheet_name: "담당자목록",
    file_suffix: "담당자목록",
    fields: &[
        field("dminsttCd", "수요기관코드"),
        field("dminsttNm", "수요기관명"),
        field("ntceInsttOfclNm", "공고기관담당자명"),
        field("ntceInsttOfclTelNo", "공고기관담당자전화번호"),
        field("ntceInsttOfclEmailAdrs", "공고기관담당자이메일주소"),
    ],
};

/// A flat record of string fields keyed by API field name.
///
/// Records are produced once per source item and not modified afterwards.
/// Whether every schema field is present depends on the normalization policy
/// used to build the record; [`Record::get`] reads absent fields as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the value of a field, or `""` when the field is absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Reports whether the field key exists on this record.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of field keys present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// A deduplication unit projected out of a bid-notice row.
///
/// Equality and hashing cover all five fields, so two contacts differing only
/// in their phone number are distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContactRecord {
    pub institution_code: String,
    pub institution_name: String,
    pub official_name: String,
    pub official_phone: String,
    pub official_email: String,
}

impl ContactRecord {
    /// Cell values in [`CONTACT`] column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.institution_code.clone(),
            self.institution_name.clone(),
            self.official_name.clone(),
            self.official_phone.clone(),
            self.official_email.clone(),
        ]
    }
}
